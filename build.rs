use std::env;
use std::path::Path;

/// Build-time settings exported to the crate through `env!`.
const BUILD_ENV_KEYS: [&str; 3] = ["WIFI_SSID", "WIFI_PASSWORD", "MQTT_BROKER_URL"];

fn main() {
    load_env_config();

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

/// Load Wi-Fi and broker settings from `.env`.
/// Variables already present in the environment take priority.
fn load_env_config() {
    println!("cargo:rerun-if-changed=.env");
    for key in BUILD_ENV_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    for key in BUILD_ENV_KEYS {
        let value = env::var(key).unwrap_or_default().trim().to_string();
        if value.is_empty() {
            println!("cargo:warning={key} is empty - using the built-in default");
        }
        println!("cargo:rustc-env={key}={value}");
    }
}
