#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate ds2502_prog;
use ds2502_prog::*;

use std::io::{
	self,
	BufRead,
	Write,
};
use std::process::exit;

use ds2502_prog::ds2502::PAGE_COUNT;
use ds2502_prog::onewire::{
	BitBang,
	Bus,
	RomId,
};
use ds2502_prog::session::{
	Collision,
	Command,
	Event,
	Report,
	Session,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter --{}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter --{}: {}", name, e);
		e.context(msg).into()
	})
}

/// Rows of 8 bytes: address, hex bytes, printable ASCII
fn hexdump(start: usize, data: &[u8]) -> String {
	let mut out = String::new();
	for (row, chunk) in data.chunks(8).enumerate() {
		out.push_str(&format!("0x{:02X}:", start + 8 * row));
		for b in chunk {
			out.push_str(&format!(" {:02X}", b));
		}
		for _ in chunk.len()..8 {
			out.push_str("   ");
		}
		out.push_str("  |");
		for &b in chunk {
			out.push(if b.is_ascii_graphic() || b' ' == b { b as char } else { '.' });
		}
		out.push_str("|\n");
	}
	out
}

fn prompt(text: &str) {
	print!("{}", text);
	let _ = io::stdout().flush();
}

struct Console;

impl Report for Console {
	fn report(&mut self, event: Event) {
		match event {
			Event::Menu => {
				println!();
				println!("1) read status");
				println!("2) read ROM");
				println!("3) read data");
				println!("4) write data");
				prompt("> ");
			},
			Event::InvalidCommand(line) => println!("Invalid command {:?}", line),
			Event::NoDevices => println!("No DS2502 found"),
			Event::Device { number, rom } => println!("Device {}: {}", number, rom),
			Event::WrongFamily { number, family } => println!("Device {}: family 0x{:02X} is not a DS2502, skipping", number, family),
			Event::RomCrc { number, error } => println!("Device {}: {}", number, error),
			Event::Status { rom, status } => {
				println!("Status of {}: {}", rom, session::encode_hex(&status.0));
				for page in 0..PAGE_COUNT {
					let redirection = match status.redirection(page) {
						Some(target) => format!("redirected to page {}", target),
						None => "not redirected".to_string(),
					};
					let protection = if status.is_protected(page) { "write protected" } else { "writable" };
					println!("  page {}: {}, {}", page, protection, redirection);
				}
			},
			Event::Rom(rom) => {
				println!("Family: 0x{:02X}", rom.family());
				println!("Serial: {}", session::encode_hex(rom.serial()));
				println!("CRC:    0x{:02X}", rom.crc());
			},
			Event::Memory { rom, data } => {
				println!("Memory of {}:", rom);
				print!("{}", hexdump(0, &data));
			},
			Event::ReadFailed(e) => println!("Read failed: {}", e),
			Event::PromptPayload => prompt("Data (hex): "),
			Event::PayloadRejected(e) => println!("{}", e),
			Event::PromptAddress => prompt("Start address (hex): "),
			Event::AddressRejected(e) => println!("{}", e),
			Event::CurrentData(data) => {
				println!("Current data:");
				print!("{}", hexdump(0, &data));
			},
			Event::Collision(c) => match c.collision {
				Collision::Unchanged => println!("0x{:02X}: already contains 0x{:02X}", c.address, c.existing),
				Collision::Correct => println!("0x{:02X}: 0x{:02X} will be correct after overwrite with 0x{:02X}", c.address, c.existing, c.requested),
				Collision::Mutated(result) => println!("0x{:02X}: 0x{:02X} can't become 0x{:02X}, will be 0x{:02X}", c.address, c.existing, c.requested, result),
			},
			Event::Preview { address, data } => {
				println!("Writing {} bytes at 0x{:02X}:", data.len(), address);
				print!("{}", hexdump(address as usize, &data));
			},
			Event::PromptConfirm => prompt("Write? (y/n): "),
			Event::Writing => println!("Writing..."),
			Event::WriteFailed(e) => println!("Write failed after {} bytes: {}", e.applied(), e),
			Event::Written { address, len } => println!("Wrote {} bytes at 0x{:02X}", len, address),
			Event::Cancelled => println!("Cancelled"),
		}
	}
}

// a DS2502 with a little content next to a temperature sensor
fn simulated_bus() -> Box<dyn Bus> {
	use ds2502_prog::sim::{
		SimDevice,
		SimWire,
	};

	let prom = SimDevice::new(RomId::new(ds2502::FAMILY_CODE, [0x5A, 0x1D, 0x00, 0x00, 0x02, 0x25]))
		.with_memory(0, b"ds2502-prog");
	let sensor = SimDevice::new(RomId::new(0x28, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]));
	Box::new(BitBang::new(SimWire::new(vec![prom, sensor])))
}

fn open_bus(matches: &clap::ArgMatches) -> AResult<Box<dyn Bus>> {
	if matches.is_present("simulate") {
		info!("Using simulated bus");
		return Ok(simulated_bus());
	}
	let config = gpio::GpioConfig {
		chip: matches.value_of("chip").unwrap_or("/dev/gpiochip0").to_string(),
		data: get_param(matches, "data")?,
		program: get_param(matches, "program")?,
	};
	Ok(Box::new(BitBang::new(gpio::GpioPins::open(&config)?)))
}

fn interactive(bus: &mut dyn Bus) -> AResult<()> {
	let mut session = Session::new();
	let mut console = Console;
	session.start(&mut console);

	let stdin = io::stdin();
	for line in stdin.lock().lines() {
		let line = line?;
		session.handle_line(&mut *bus, &mut console, &line);
	}
	println!();
	debug!("end of input in state {:?}", session.state());
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg chip: --chip +takes_value "GPIO chip (default /dev/gpiochip0)")
		(@arg data: --data +takes_value "line offset of the 1-Wire data line")
		(@arg program: --program +takes_value "line offset of the (active low) programming voltage switch")
		(@arg simulate: --simulate "use a simulated bus instead of GPIO lines")
		(@arg realtime: --realtime "run with SCHED_FIFO and locked memory")
		(@subcommand menu =>
			(about: "interactive read and write menu (default)")
		)
		(@subcommand list =>
			(about: "list DS2502 devices")
		)
		(@subcommand read =>
			(about: "dump memory of all DS2502 devices")
		)
		(@subcommand status =>
			(about: "show status page of all DS2502 devices")
		)
	).get_matches();

	let mut bus = open_bus(&matches)?;
	let _realtime = if matches.is_present("realtime") {
		Some(realtime::Realtime::enter()?)
	} else {
		None
	};

	match matches.subcommand() {
		("list", _) => session::dispatch(&mut *bus, &mut Console, Command::ReadRom),
		("read", _) => session::dispatch(&mut *bus, &mut Console, Command::ReadData),
		("status", _) => session::dispatch(&mut *bus, &mut Console, Command::ReadStatus),
		("menu", _) | ("", _) => interactive(&mut *bus)?,
		(cmd, _) => bail!("unknown command {}", cmd),
	}

	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
