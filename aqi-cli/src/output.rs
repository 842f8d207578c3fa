use aqi_core::{Snapshot, StationRecord, display};
use chrono::Utc;
use serde_json::Value;

pub fn print_table(title: &str, stations: &[StationRecord]) {
    if stations.is_empty() {
        println!("No stations reporting for {title}.");
        return;
    }

    let now = Utc::now();
    println!("{title}: {} station(s)", stations.len());
    println!(
        "{:<32} {:>5}  {:<32} {:>8} {:>8}  {}",
        "STATION", "AQI", "CATEGORY", "PM2.5", "PM10", "UPDATED"
    );

    for s in stations {
        let aqi = if s.reading.is_measured() { s.aqi().to_string() } else { "N/A".to_string() };
        println!(
            "{:<32} {:>5}  {} {:<29} {:>8.1} {:>8.1}  {}",
            truncate(&s.name, 32),
            aqi,
            s.emoji(),
            s.category(),
            display::effective_pm25(s),
            display::effective_pm10(s),
            display::format_relative(s.timestamp, now),
        );
    }

    if let Some(worst) = stations
        .iter()
        .filter(|s| s.reading.is_measured())
        .max_by_key(|s| s.aqi())
    {
        println!();
        println!("Alerts for {} (highest AQI):", worst.name);
        println!("  {}", display::health_alert(worst).message());
        println!("  {}", display::pm25_alert(worst).message());
    }
}

pub fn print_snapshot(title: &str, snapshot: &Snapshot) {
    println!();
    println!("── refreshed {} ──", snapshot.fetched_at.format("%H:%M:%S UTC"));
    print_table(title, &snapshot.stations);
}

pub fn print_json(stations: &[StationRecord]) -> anyhow::Result<()> {
    let records = stations
        .iter()
        .map(station_json)
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// The stored record plus the classification fields consumers expect.
fn station_json(station: &StationRecord) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(station)?;
    if let Value::Object(map) = &mut value {
        map.insert("aqi".into(), station.aqi().into());
        map.insert("category".into(), station.category().into());
        map.insert("emoji".into(), station.emoji().into());
        map.insert("message".into(), station.message().into());
    }
    Ok(value)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}
