/*
 *  display/factory.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display driver factory
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::info;

use crate::config::{DisplayConfig, DriverKind};
use crate::display::drivers::mock::MockDriver;
use crate::display::error::DisplayFactoryError;
use crate::display::traits::DisplayDriver;

#[cfg(feature = "console-driver")]
use crate::display::drivers::console::ConsoleDriver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create a display driver from configuration
    ///
    /// Falls back to the console driver when none is named. The driver is
    /// returned uninitialized; the service calls `init()`.
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedDriver, DisplayFactoryError> {
        Self::validate_config(config)?;
        Self::create(config.driver.unwrap_or(DriverKind::Console))
    }

    pub fn create(kind: DriverKind) -> Result<BoxedDriver, DisplayFactoryError> {
        info!("Creating {:?} display driver", kind);
        match kind {
            DriverKind::Mock => Ok(Box::new(MockDriver::new())),

            #[cfg(feature = "console-driver")]
            DriverKind::Console => Ok(Box::new(ConsoleDriver::stdout())),

            #[cfg(not(feature = "console-driver"))]
            DriverKind::Console => Err(DisplayFactoryError::DriverNotEnabled(
                "console (enable with --features console-driver)".to_string(),
            )),
        }
    }

    /// Validate a configuration without creating a driver
    pub fn validate_config(config: &DisplayConfig) -> Result<(), DisplayFactoryError> {
        if config.preview == Some(true) && config.driver == Some(DriverKind::Console) {
            return Err(DisplayFactoryError::ConfigError(
                "preview already renders to the console; pick the mock driver for the device".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock() {
        let config = DisplayConfig {
            driver: Some(DriverKind::Mock),
            ..Default::default()
        };
        let driver = DisplayDriverFactory::create_from_config(&config).unwrap();
        assert_eq!(driver.capabilities().name, "mock");
        assert_eq!(driver.dimensions(), (25, 25));
    }

    #[cfg(feature = "console-driver")]
    #[test]
    fn test_default_is_console() {
        let driver = DisplayDriverFactory::create_from_config(&DisplayConfig::default()).unwrap();
        assert!(driver.capabilities().is_preview);
    }

    #[test]
    fn test_validate_console_twice() {
        let config = DisplayConfig {
            driver: Some(DriverKind::Console),
            preview: Some(true),
            ..Default::default()
        };
        assert!(DisplayDriverFactory::validate_config(&config).is_err());
    }
}
