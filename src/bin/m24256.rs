#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate m24256_eeprom;
use m24256_eeprom::*;

use std::io::{
	self,
	Write,
};
use std::num::ParseIntError;
use std::process::exit;

use m24256_eeprom::bus::BusTransport;
use m24256_eeprom::protect::WriteProtectGate;
use m24256_eeprom::sim::SimulatedEeprom;
use m24256_eeprom::sysfs::GpioChip;

fn get_number<T>(matches: &clap::ArgMatches, name: &str, from_str_radix: fn(&str, u32) -> Result<T, ParseIntError>) -> AResult<Option<T>> {
	match matches.value_of(name) {
		None => Ok(None),
		Some(p) => parse_number(p, from_str_radix).map(Some).map_err(|e| {
			let msg = format!("invalid parameter {}: {}", name, e);
			e.context(msg).into()
		}),
	}
}

fn get_required<T>(matches: &clap::ArgMatches, name: &str, from_str_radix: fn(&str, u32) -> Result<T, ParseIntError>) -> AResult<T> {
	match get_number(matches, name, from_str_radix)? {
		Some(v) => Ok(v),
		None => bail!("missing parameter {}", name),
	}
}

fn print_hex(address: u16, data: &[u8]) {
	let base = usize::from(address);
	for (i, line) in data.chunks(16).enumerate() {
		print!("{:04x} ", base + 16 * i);
		for (j, b) in line.iter().enumerate() {
			if 8 == j {
				print!(" ");
			}
			print!(" {:02x}", b);
		}
		println!("");
	}
}

fn geometry(matches: &clap::ArgMatches) -> AResult<DeviceGeometry> {
	let mut geometry = DeviceGeometry::m24256();
	if let Some(e) = get_number(matches, "chip_enable", u8::from_str_radix)? {
		ensure!(e < 8, "chip enable bits out of range: {}", e);
		geometry = geometry.with_chip_enable(e);
	}
	if let Some(max) = get_number(matches, "max_transfer", usize::from_str_radix)? {
		geometry = geometry.with_max_transfer(max);
	}
	geometry.validate()?;
	Ok(geometry)
}

fn config(matches: &clap::ArgMatches) -> AResult<DriverConfig> {
	let mut config = DriverConfig::default();
	if let Some(hz) = get_number(matches, "clock", u32::from_str_radix)? {
		ensure!(hz > 0, "clock frequency must not be zero");
		config.clock_hz = hz;
	}
	Ok(config)
}

fn plan(geometry: &DeviceGeometry, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = get_required(sub_m, "ADDRESS", u16::from_str_radix)?;
	let length = get_required(sub_m, "LENGTH", usize::from_str_radix)?;

	geometry.check_range(address, length)?;
	for chunk in plan_chunks(address, length, geometry.page_size, geometry.max_chunks)? {
		println!("@{:04x}: {} bytes", chunk.address, chunk.length);
	}
	Ok(())
}

fn dump<T: BusTransport, G: WriteProtectGate>(eeprom: &Eeprom<T, G>) -> AResult<()> {
	let geometry = eeprom.geometry();
	let mut buf = vec![0u8; geometry.max_transfer.min(geometry.capacity)];
	let stdout = io::stdout();
	let mut out = stdout.lock();
	let mut address = 0;
	while address < geometry.capacity {
		let len = buf.len().min(geometry.capacity - address);
		if let Err(e) = eeprom.read_into(address as u16, &mut buf[..len]) {
			bail!("dump @0x{:04x}: {}", address, e);
		}
		out.write_all(&buf[..len])?;
		address += len;
	}
	out.flush()?;
	Ok(())
}

fn run<T: BusTransport, G: WriteProtectGate>(eeprom: Eeprom<T, G>, matches: &clap::ArgMatches) -> AResult<()> {
	match matches.subcommand() {
		("read", Some(sub_m)) => {
			let address = get_required(sub_m, "ADDRESS", u16::from_str_radix)?;
			let length = get_required(sub_m, "LENGTH", usize::from_str_radix)?;
			let data = eeprom.read(address, length)?;
			print_hex(address, &data);
			Ok(())
		},
		("dump", _) => {
			dump(&eeprom)
		},
		("write", Some(sub_m)) => {
			let address = get_required(sub_m, "ADDRESS", u16::from_str_radix)?;
			let data = match sub_m.values_of("DATA") {
				Some(values) => parse_hex_bytes(values)?,
				None => bail!("missing parameter DATA"),
			};
			let verify = !sub_m.is_present("no_verify");
			eeprom.write(address, &data, verify)?;
			info!("wrote {} bytes at 0x{:04x}{}", data.len(), address, if verify { " (verified)" } else { "" });
			Ok(())
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg simulate: --simulate "use a simulated (blank) device instead of GPIO lines")
		(@arg sda: --sda +takes_value "GPIO number of the SDA line")
		(@arg scl: --scl +takes_value "GPIO number of the SCL line")
		(@arg wp: --wp +takes_value "GPIO number of the write control line (hardwired writable if not given)")
		(@arg wp_active_low: --("wp-active-low") "write control line protects when low")
		(@arg chip_enable: --("chip-enable") +takes_value "chip enable inputs E2..E0 (0-7)")
		(@arg clock: --clock +takes_value "bus clock frequency in Hz")
		(@arg max_transfer: --("max-transfer") +takes_value "largest transfer per call in bytes")
		(@subcommand plan =>
			(about: "show how a transfer gets split at page boundaries")
			(@arg ADDRESS: +required "start address")
			(@arg LENGTH: +required "length in bytes")
		)
		(@subcommand read =>
			(about: "read and print as hex")
			(@arg ADDRESS: +required "start address")
			(@arg LENGTH: +required "length in bytes")
		)
		(@subcommand dump =>
			(about: "dump whole device as binary to stdout")
		)
		(@subcommand write =>
			(about: "write hex bytes (even count)")
			(@arg no_verify: --("no-verify") "don't read back written data")
			(@arg ADDRESS: +required "start address")
			(@arg DATA: +required ... "hex data")
		)
	).get_matches();

	let geometry = geometry(&matches)?;
	let config = config(&matches)?;

	if let ("plan", Some(sub_m)) = matches.subcommand() {
		return plan(&geometry, sub_m);
	}

	if matches.is_present("simulate") {
		let sim = SimulatedEeprom::new(geometry);
		let gate = sim.gate();
		return run(Eeprom::new(bus::SharedBus::new(sim), gate, geometry, config)?, &matches);
	}

	let sda = match get_number(&matches, "sda", u32::from_str_radix)? {
		Some(n) => n,
		None => bail!("need --sda and --scl (or --simulate)"),
	};
	let scl = match get_number(&matches, "scl", u32::from_str_radix)? {
		Some(n) => n,
		None => bail!("need --sda and --scl (or --simulate)"),
	};
	let chip = GpioChip::sysfs();
	let transport = bus::SharedBus::new(sysfs::open_bus(&chip, sda, scl)?);
	match get_number(&matches, "wp", u32::from_str_radix)? {
		Some(wp) => {
			let gate = sysfs::open_write_protect(&chip, wp, !matches.is_present("wp_active_low"))?;
			run(Eeprom::new(transport, gate, geometry, config)?, &matches)
		},
		None => {
			warn!("no write control line given, assuming it is hardwired writable");
			run(Eeprom::new(transport, (), geometry, config)?, &matches)
		},
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
