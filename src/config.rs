//! Environment-seeded defaults for the CLI's device/platform flags: a
//! `.env` file is loaded lazily, once, via `dotenvy` + `once_cell::Lazy`,
//! and then read through plain `std::env::var`. `MAESTRO_DEVICE`/
//! `MAESTRO_PLATFORM` are optional hints, not a required connection
//! string, so a missing value just falls back to `None` rather than
//! aborting the process.

use once_cell::sync::Lazy;
use std::env;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub device: Option<String>,
    pub platform: Option<String>,
}

impl EnvDefaults {
    pub fn load() -> Self {
        Lazy::force(&DOTENV_LOADED);
        Self { device: env::var("MAESTRO_DEVICE").ok(), platform: env::var("MAESTRO_PLATFORM").ok() }
    }
}
