//! Boot glue: image confirmation and device restart.
//!
//! - **`target_os = "espidf"`**: `esp-ota` marks the running app slot
//!   valid (cancelling rollback) and performs the soft reset.
//! - **all other targets**: confirmation is recorded in memory and a
//!   restart panics, which host tests observe with `catch_unwind`.

use log::info;

use crate::app::ports::{BootPort, RestartPort};

/// ESP-IDF generic failure code, reported when `esp-ota` gives no code.
#[cfg(target_os = "espidf")]
const ESP_FAIL: i32 = -1;

#[derive(Default)]
pub struct EspBoot {
    confirmed: bool,
}

impl EspBoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed
    }
}

impl BootPort for EspBoot {
    #[cfg(target_os = "espidf")]
    fn confirm_image(&mut self) -> Result<(), i32> {
        esp_ota::mark_app_valid().map_err(|e| {
            log::warn!("Boot: mark_app_valid failed: {:?}", e);
            ESP_FAIL
        })?;
        self.confirmed = true;
        info!("Boot: app slot marked valid (rollback cancelled)");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn confirm_image(&mut self) -> Result<(), i32> {
        self.confirmed = true;
        info!("Boot(sim): image confirmed");
        Ok(())
    }
}

impl RestartPort for EspBoot {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) -> ! {
        info!("Boot: restarting");
        esp_ota::restart();
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) -> ! {
        panic!("device restart (simulation, no real hardware reset)");
    }
}
