//! 1-Wire master pins on a Linux GPIO character device
//!
//! The data line is requested open-drain with an external pull-up:
//! "active" releases the line, "inactive" pulls it low. The programming
//! line switches the 12V programming voltage and is active-low.

use gpiocdev::line::{
	Drive,
	Offset,
	Value,
};
use gpiocdev::request::{
	Config,
	Request,
};

use crate::onewire::Hardware;
use crate::AResult;

#[derive(Clone, Debug)]
pub struct GpioConfig {
	/// e.g. "/dev/gpiochip0" or "gpiochip0"
	pub chip: String,
	pub data: Offset,
	pub program: Offset,
}

// data line released, programming voltage off
fn line_config(config: &GpioConfig) -> Config {
	let mut cfg = Config::default();
	cfg.with_line(config.data).as_output(Value::Active).with_drive(Drive::OpenDrain);
	cfg.with_line(config.program).as_output(Value::Inactive).as_active_low();
	cfg
}

pub struct GpioPins {
	request: Request,
	data: Offset,
	program: Offset,
}

impl GpioPins {
	pub fn open(config: &GpioConfig) -> AResult<Self> {
		ensure!(config.data != config.program, "data and programming line must differ (both {})", config.data);

		let cfg = line_config(config);

		let request = with_context!(("couldn't request lines {} and {} on {}", config.data, config.program, config.chip), {
			Ok(Request::from_config(cfg)
				.on_chip(&config.chip)
				.with_consumer("ds2502-prog")
				.request()?)
		})?;
		info!("Using {} (data={}, program={})", config.chip, config.data, config.program);

		Ok(GpioPins {
			request,
			data: config.data,
			program: config.program,
		})
	}

	fn set(&self, line: Offset, value: Value) {
		if let Err(e) = self.request.set_value(line, value) {
			error!("Failed to set line {}: {}", line, e);
		}
	}
}

impl Hardware for GpioPins {
	fn pull_low(&mut self, low: bool) {
		self.set(self.data, if low { Value::Inactive } else { Value::Active });
	}

	fn read_pin(&mut self) -> bool {
		match self.request.value(self.data) {
			Ok(value) => Value::Active == value,
			Err(e) => {
				error!("Failed to read line {}: {}", self.data, e);
				// an idle bus reads HIGH
				true
			},
		}
	}

	fn set_program_enable(&mut self, active: bool) {
		self.set(self.program, if active { Value::Active } else { Value::Inactive });
	}
}

impl Drop for GpioPins {
	fn drop(&mut self) {
		// never leave the programming voltage on
		self.set_program_enable(false);
		self.pull_low(false);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gpiocdev::line::Direction;

	#[test]
	fn requested_lines() {
		let cfg = line_config(&GpioConfig {
			chip: "gpiochip0".to_string(),
			data: 17,
			program: 27,
		});

		let data = cfg.line_config(17).unwrap();
		assert_eq!(data.direction, Some(Direction::Output));
		assert_eq!(data.drive, Some(Drive::OpenDrain));
		assert_eq!(data.value, Some(Value::Active));
		assert!(!data.active_low);

		let program = cfg.line_config(27).unwrap();
		assert_eq!(program.direction, Some(Direction::Output));
		assert_eq!(program.value, Some(Value::Inactive));
		assert!(program.active_low);
	}
}
