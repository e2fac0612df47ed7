//! Read-only commands

use super::{print_reading, report, CommandResult, Context};
use colorbridge_device::{registry, temperature, DEFAULT_TRIES};

/// Read a register and print raw and scaled values
pub async fn get(ctx: &Context, param: &str, tries: usize) -> CommandResult {
    let descriptor = match registry::describe(param) {
        Ok(d) => d,
        Err(e) => return report(Err(e)),
    };
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };

    let reading = match dev.read_value(param, tries.max(1)).await {
        Ok(r) => r,
        Err(e) => return report(Err(e)),
    };
    let reading = reading.map(|raw| match descriptor.scale {
        Some(scale) => format!("{raw} (0x{raw:X}) = {}", raw as f64 / scale),
        None => format!("{raw} (0x{raw:X})"),
    });
    print_reading(param, reading);
    Ok(())
}

/// Temperature in °C
pub async fn temp(ctx: &Context, avg: bool) -> CommandResult {
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    let (label, reading) = if avg {
        ("tempavg", dev.read_temperature_avg().await)
    } else {
        ("temp", dev.read_temperature_now().await)
    };
    match reading {
        Ok(r) => print_reading(label, r.map(|c| format!("{c:.2} °C"))),
        Err(e) => return report(Err(e)),
    }
    Ok(())
}

/// Raw probes, one per line, with their conversion
pub async fn temp_dbg(ctx: &Context) -> CommandResult {
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    let reading = match dev.read_temperature_probes().await {
        Ok(r) => r,
        Err(e) => return report(Err(e)),
    };
    let Some(probes) = reading.value else {
        eprintln!("temp: device offline");
        return Ok(());
    };

    println!(
        "{} probes ({} wanted, {} attempts max)",
        probes.len(),
        temperature::PROBE_COUNT,
        temperature::MAX_PROBE_ATTEMPTS
    );
    for (i, raw) in probes.iter().enumerate() {
        match temperature::calc_temperature(*raw) {
            Some(c) => println!("  {i:2}: {raw:5} -> {c:.2} °C"),
            None => println!("  {i:2}: {raw:5} -> out of range"),
        }
    }
    let valid: Vec<f64> = probes
        .iter()
        .filter_map(|&raw| temperature::calc_temperature(raw))
        .collect();
    if let Some(median) = temperature::median(&valid) {
        println!("median of valid probes: {median:.2} °C");
    }
    Ok(())
}

/// Current color
pub async fn color(ctx: &Context) -> CommandResult {
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    match dev.read_color(DEFAULT_TRIES).await {
        Ok(r) => print_reading("color", r),
        Err(e) => return report(Err(e)),
    }
    Ok(())
}

/// Registers and commands
pub fn help() -> CommandResult {
    println!("Registers:");
    println!(
        "  {:<12} {:>6} {:>6} {:>6} {:>8} {:>8}",
        "NAME", "GET", "SET", "WIDTH", "SCALE", "MAX"
    );
    for p in registry::all() {
        let setter = if p.writable {
            format!("0x{:02X}", p.setter())
        } else {
            "-".to_string()
        };
        let scale = p.scale.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "  {:<12} {:>6} {:>6} {:>6} {:>8} {:>8}",
            p.name,
            format!("0x{:02X}", p.getter()),
            setter,
            p.width.bytes(),
            scale,
            p.raw_limit()
        );
    }
    println!();
    println!("Commands:");
    for (name, what) in [
        ("serve", "run the bridge"),
        ("get <param>", "read a register"),
        ("set <param> <value> [--raw]", "write a register"),
        ("resync", "reset the board's frame parser"),
        ("temp [--avg]", "temperature in °C"),
        ("temp-dbg", "raw temperature probes"),
        ("color [raw]", "read, or write a raw color word"),
        ("hue [h]", "fixed hue, 0..1"),
        ("time [s]", "hue loop period in seconds"),
        ("saturation [s]", "saturation, 0..1"),
        ("value [v]", "value, 0..1"),
        ("mode [m]", "rgb, hsv, hsv-max"),
        ("ports", "list serial ports"),
    ] {
        println!("  {name:<28} {what}");
    }
    println!();
    println!("Each register above is read with `get <name>` and written with `set <name> <value>`.");
    Ok(())
}

/// Serial ports on this machine
pub fn ports() -> CommandResult {
    let ports = colorbridge_transport::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }
    for port in ports {
        match (port.usb_ids, port.product) {
            (Some((vid, pid)), Some(product)) => {
                println!("{}  {vid:04x}:{pid:04x}  {product}", port.path)
            }
            (Some((vid, pid)), None) => println!("{}  {vid:04x}:{pid:04x}", port.path),
            _ => println!("{}", port.path),
        }
    }
    Ok(())
}
