use clap::{App, Arg, ArgMatches};
use colored::*;
use ibutton::sim::{SimulatedBus, SimulatedIndicator};
use ibutton::{DetectorAgent, DetectorConfig, Identifier, OutboundRecord};
use std::path::Path;
use std::time::Duration;
use tokio::time;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "ibutton.toml";
const DEFAULT_TICKS: &str = "200";
const DEFAULT_HOLD_TICKS: &str = "3";
const DEFAULT_FAMILY: &str = "01";
const SIM_BUS_DESCRIPTOR: u8 = 0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = App::new("ibutton-simulator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs the iButton detector against a simulated 1-Wire bus")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file (defaults used if missing)")
                .takes_value(true)
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::with_name("polling-ms")
                .long("polling-ms")
                .value_name("MS")
                .help("Override the polling period")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("grant-s")
                .long("grant-s")
                .value_name("SECONDS")
                .help("Override the indicator grant period")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("touch-at")
                .long("touch-at")
                .value_name("TICK")
                .help("Tick at which a token touches the reader (repeatable)")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("hold")
                .long("hold")
                .value_name("TICKS")
                .help("How many ticks each touch lasts")
                .takes_value(true)
                .default_value(DEFAULT_HOLD_TICKS),
        )
        .arg(
            Arg::with_name("ticks")
                .short("n")
                .long("ticks")
                .value_name("N")
                .help("Number of polling periods to simulate")
                .takes_value(true)
                .default_value(DEFAULT_TICKS),
        )
        .arg(
            Arg::with_name("family")
                .long("family")
                .value_name("HEX")
                .help("Family code of the simulated token")
                .takes_value(true)
                .default_value(DEFAULT_FAMILY),
        )
        .arg(
            Arg::with_name("corrupt")
                .long("corrupt")
                .help("Present tokens with a wrong check byte"),
        )
        .get_matches();

    let config = build_config(&matches)?;
    let ticks: u32 = matches.value_of("ticks").unwrap_or(DEFAULT_TICKS).parse()?;
    let hold: u32 = matches.value_of("hold").unwrap_or(DEFAULT_HOLD_TICKS).parse()?;
    let family = u8::from_str_radix(matches.value_of("family").unwrap_or(DEFAULT_FAMILY), 16)?;
    let corrupt = matches.is_present("corrupt");
    let mut touches: Vec<u32> = match matches.values_of("touch-at") {
        Some(values) => values.map(str::parse::<u32>).collect::<Result<_, _>>()?,
        None => vec![10],
    };
    touches.sort_unstable();

    println!("{}", "🔑 iButton Detector Simulator".bold());
    println!("==============================");
    println!(
        "   polling {} ms, grant {} s, module tag {}",
        config.polling_period_ms, config.grant_period_s, config.module_id
    );

    let period = config.polling_period();
    let bus = SimulatedBus::new();
    let indicator = SimulatedIndicator::new();

    let handle = DetectorAgent::init(
        bus.clone(),
        SIM_BUS_DESCRIPTOR,
        indicator.clone(),
        config,
        print_record,
    )?;

    // Script runs half a period out of phase with the detector's ticks
    time::sleep(period / 2).await;
    let mut interval = time::interval(period);
    for tick in 0..ticks {
        interval.tick().await;

        if let Some(index) = touches.iter().position(|&t| t == tick) {
            let identifier = token_for(family, index as u8, corrupt);
            info!("Token {} touches reader at tick {}", identifier, tick);
            bus.attach(identifier);
        } else if touches.iter().any(|&t| tick == t + hold) {
            bus.detach();
        }
    }

    // Let the worker drain anything still pending
    time::sleep(Duration::from_millis(10)).await;

    let stats = handle.stats();
    println!("{}", "📊 Summary".bold());
    println!("   ticks:            {}", stats.ticks);
    println!("   presence pulses:  {}", stats.presence_pulses);
    println!("   detections:       {}", stats.detections);
    println!("   records emitted:  {}", stats.records_emitted);
    println!("   crc mismatches:   {}", stats.crc_mismatches);
    println!("   spurious reads:   {}", stats.spurious_reads);
    println!("   indicator on:     {}", indicator.is_on());

    handle.shutdown();
    Ok(())
}

fn build_config(matches: &ArgMatches) -> Result<DetectorConfig, Box<dyn std::error::Error>> {
    let path = matches.value_of("config").unwrap_or(DEFAULT_CONFIG);
    let mut config = DetectorConfig::load(Path::new(path))?;

    if let Some(ms) = matches.value_of("polling-ms") {
        config.polling_period_ms = ms.parse()?;
    }
    if let Some(s) = matches.value_of("grant-s") {
        config.grant_period_s = s.parse()?;
    }
    config.validate()?;
    Ok(config)
}

fn token_for(family: u8, index: u8, corrupt: bool) -> Identifier {
    let valid = Identifier::with_check_byte(family, [index, 0xA2, 0x3C, 0x55, 0x11, 0x00]);
    if !corrupt {
        return valid;
    }
    let mut bytes = *valid.as_bytes();
    bytes[7] ^= 0xFF;
    Identifier::from_bytes(bytes)
}

fn print_record(record: &OutboundRecord) {
    let hex: Vec<String> = record.as_bytes().iter().map(|b| format!("{:02X}", b)).collect();
    let kind = if record.as_ack { "REPLY".yellow() } else { "EVENT".green() };
    println!("📤 {} [{}]", kind.bold(), hex.join(" "));
}
