//! RGB indicator LED driver.
//!
//! Three PWM channels drive discrete R/G/B LEDs (or a common-cathode RGB
//! LED).  Generic over [`SetDutyCycle`], so the LEDC channels on the
//! device and in-memory channels in tests go through the same code.

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::app::ports::OutputSink;
use crate::error::OutputError;
use crate::render::Color;

pub struct PwmLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    current: Color,
}

impl<R, G, B> PwmLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    /// Take ownership of the three channels and switch the LED off.
    pub fn new(red: R, green: G, blue: B) -> Result<Self, OutputError> {
        let mut led = Self {
            red,
            green,
            blue,
            current: crate::render::color::BLACK,
        };
        led.set_color(crate::render::color::BLACK)?;
        Ok(led)
    }

    pub fn current_color(&self) -> Color {
        self.current
    }
}

fn write_channel<P: SetDutyCycle>(channel: &mut P, level: f32) -> Result<(), OutputError> {
    let max = channel.max_duty_cycle();
    let duty = (level.clamp(0.0, 1.0) * f32::from(max)).round() as u16;
    channel
        .set_duty_cycle(duty)
        .map_err(|_| OutputError::PwmWriteFailed)
}

impl<R, G, B> OutputSink for PwmLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    fn set_color(&mut self, color: Color) -> Result<(), OutputError> {
        write_channel(&mut self.red, color.r())?;
        write_channel(&mut self.green, color.g())?;
        write_channel(&mut self.blue, color.b())?;
        self.current = color;
        debug!("LED: ({:.3}, {:.3}, {:.3})", color.r(), color.g(), color.b());
        Ok(())
    }
}
