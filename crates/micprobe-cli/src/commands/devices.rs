//! Audio device listing command.

use clap::Args;
use micprobe_io::{CpalBackend, DeviceInfo, DuplexBackend};
use std::collections::BTreeMap;

#[derive(Args)]
pub struct DevicesArgs {
    /// Only show devices on this host (e.g. ALSA, JACK, CoreAudio)
    #[arg(long)]
    host: Option<String>,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let backend = CpalBackend::new();
    let devices = backend.list_devices()?;
    let (default_input, default_output) = backend.default_devices()?;

    let mut by_host: BTreeMap<&str, Vec<&DeviceInfo>> = BTreeMap::new();
    for device in &devices {
        if args
            .host
            .as_deref()
            .is_some_and(|h| !device.handle.host.eq_ignore_ascii_case(h))
        {
            continue;
        }
        by_host.entry(&device.handle.host).or_default().push(device);
    }

    if by_host.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }

    println!("Available Audio Devices");
    println!("=======================\n");

    for (host, devices) in &by_host {
        println!("{host}:");
        for device in devices {
            let direction = match (device.is_input, device.is_output) {
                (true, true) => "in/out",
                (true, false) => "in",
                _ => "out",
            };
            let mut marks = String::new();
            if default_input.as_ref() == Some(&device.handle) {
                marks.push_str(" [default input]");
            }
            if default_output.as_ref() == Some(&device.handle) {
                marks.push_str(" [default output]");
            }
            println!(
                "  {}:{}  {} ({}, {} Hz){}",
                host,
                device.handle.index,
                device.handle.name,
                direction,
                device.default_sample_rate,
                marks
            );
        }
        println!();
    }

    println!("Input and output must share a host.");
    println!("Tip: pass host:index, a list position or part of the name:");
    println!("  micprobe record sm58 --input ALSA:1 --output ALSA:1");
    println!("  micprobe record sm58 --input \"USB\" --output \"USB\"");
    Ok(())
}
