//! Commands that write to the board

use super::{report, CommandResult, Context};
use colorbridge_device::{Color, ColorMode, DEFAULT_TRIES};

/// Write a register, scaled unless `raw`
pub async fn set(ctx: &Context, param: &str, value: f64, raw: bool) -> CommandResult {
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    let result = dev.send_command(param, value, !raw).await;
    if result.is_ok() {
        println!("{param} <- {value}{}", if raw { " (raw)" } else { "" });
    }
    report(result)
}

/// Reset the board's frame parser
pub async fn resync(ctx: &Context) -> CommandResult {
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    let result = dev.resync().await;
    if result.is_ok() {
        println!("Resynchronized {}", dev.describe());
    }
    report(result)
}

/// Parse a color word: `0x`-prefixed hex or decimal
pub fn parse_raw_color(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => s.parse().ok(),
    }
}

/// Write a raw color word
pub async fn color_raw(ctx: &Context, raw: &str) -> CommandResult {
    let Some(word) = parse_raw_color(raw) else {
        eprintln!("Invalid color word {raw:?}: expected 0x-prefixed hex or decimal");
        return Ok(());
    };
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    let color = Color::from_raw(word);
    let result = dev.write_color(color).await;
    if result.is_ok() {
        println!("color <- {color}");
    }
    report(result)
}

fn check_unit(name: &str, x: f64) -> bool {
    if (0.0..=1.0).contains(&x) {
        true
    } else {
        eprintln!("{name} must be within 0..1, got {x}");
        false
    }
}

/// Read the color, print one field or apply `edit` and write it back
async fn edit_color<F>(
    ctx: &Context,
    field: &str,
    get: fn(&Color) -> Option<f64>,
    edit: Option<F>,
) -> CommandResult
where
    F: FnOnce(&mut Color),
{
    let Some(mut dev) = ctx.open_device::<()>() else {
        return Ok(());
    };
    let mut color = match dev.read_color(DEFAULT_TRIES).await {
        Ok(reading) => match reading.into_result() {
            Ok(color) => color,
            Err(e) => return report(Err(e)),
        },
        Err(e) => return report(Err(e)),
    };

    let Some(edit) = edit else {
        match get(&color) {
            Some(x) => println!("{field}: {x:.3}"),
            None => println!("{field}: not used by {color}"),
        }
        return Ok(());
    };

    edit(&mut color);
    let result = dev.write_color(color).await;
    if result.is_ok() {
        println!("color <- {color}");
    }
    report(result)
}

pub async fn hue(ctx: &Context, hue: Option<f64>) -> CommandResult {
    if hue.is_some_and(|h| !check_unit("hue", h)) {
        return Ok(());
    }
    edit_color(ctx, "hue", Color::hue, hue.map(|h| move |c: &mut Color| c.set_hue(h))).await
}

pub async fn time(ctx: &Context, seconds: Option<f64>) -> CommandResult {
    if let Some(s) = seconds.filter(|s| !(s.is_finite() && *s >= 0.0)) {
        eprintln!("time must be a non-negative number of seconds, got {s}");
        return Ok(());
    }
    edit_color(
        ctx,
        "time",
        Color::time,
        seconds.map(|s| move |c: &mut Color| c.set_time(s)),
    )
    .await
}

pub async fn saturation(ctx: &Context, saturation: Option<f64>) -> CommandResult {
    if saturation.is_some_and(|s| !check_unit("saturation", s)) {
        return Ok(());
    }
    edit_color(
        ctx,
        "saturation",
        Color::saturation,
        saturation.map(|s| move |c: &mut Color| c.set_saturation(s)),
    )
    .await
}

pub async fn value(ctx: &Context, value: Option<f64>) -> CommandResult {
    if value.is_some_and(|v| !check_unit("value", v)) {
        return Ok(());
    }
    edit_color(
        ctx,
        "value",
        Color::value,
        value.map(|v| move |c: &mut Color| c.set_value(v)),
    )
    .await
}

pub async fn mode(ctx: &Context, mode: Option<&str>) -> CommandResult {
    let Some(name) = mode else {
        let Some(mut dev) = ctx.open_device::<()>() else {
            return Ok(());
        };
        match dev.read_color(DEFAULT_TRIES).await {
            Ok(reading) => super::print_reading("mode", reading.map(|c| c.mode())),
            Err(e) => return report(Err(e)),
        }
        return Ok(());
    };

    let Some(mode) = ColorMode::parse(name) else {
        eprintln!("Unknown mode {name:?}: expected rgb, hsv or hsv-max");
        return Ok(());
    };
    edit_color(ctx, "mode", |_| None, Some(move |c: &mut Color| c.set_mode(mode))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_color() {
        assert_eq!(parse_raw_color("0x0180FFFF"), Some(0x0180_FFFF));
        assert_eq!(parse_raw_color("0X41_24_FF_FF"), Some(0x4124_FFFF));
        assert_eq!(parse_raw_color(" 255 "), Some(255));
        assert_eq!(parse_raw_color("0x1_0000_0000"), None);
        assert_eq!(parse_raw_color("red"), None);
        assert_eq!(parse_raw_color("-1"), None);
    }
}
