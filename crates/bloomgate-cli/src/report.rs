//! Console and JSON rendering of benchmark results.

use std::time::Duration;

use serde_json::{json, Value};

use bloomgate_core::{BenchObserver, BenchReport, LoadReport, ModeSummary, TrialResult};

/// Prints progress lines as the benchmark advances.
pub struct TextReporter;

impl BenchObserver for TextReporter {
    fn on_loaded(&mut self, report: &LoadReport) {
        println!(
            "Entries saved: {} in {}",
            report.written,
            format_duration(report.elapsed)
        );
    }

    fn on_mode_start(&mut self, filter_enabled: bool) {
        println!(
            "Running benchmark with Bloom filter {}...",
            mode_label(filter_enabled)
        );
    }

    fn on_trial(&mut self, _filter_enabled: bool, run: usize, result: &TrialResult) {
        println!(
            "  Run {run}: time={}, hits={}, misses={}, hit rate={:.2}%",
            format_duration(result.elapsed),
            result.hits,
            result.misses,
            result.hit_rate() * 100.0
        );
    }
}

fn mode_label(filter_enabled: bool) -> &'static str {
    if filter_enabled {
        "ENABLED"
    } else {
        "DISABLED"
    }
}

pub fn print_summary(report: &BenchReport) {
    let rule = "-".repeat(25);
    for mode in [&report.enabled, &report.disabled] {
        println!("{rule}");
        println!("Bloom filter {}:", mode_label(mode.filter_enabled));
        println!("  Avg time: {}", format_duration(mode.avg_elapsed()));
        println!("  Avg hit rate: {:.2}%", mode.hit_rate() * 100.0);
    }
    println!("{rule}");
    match report.speedup() {
        Some(s) => println!("Speedup with Bloom filter ON: {s:.2}x"),
        None => println!("Speedup with Bloom filter ON: n/a (filtered runs took no measurable time)"),
    }
}

pub fn report_json(report: &BenchReport, seed: u64) -> Value {
    json!({
        "seed": seed,
        "load": {
            "entries": report.load.written,
            "elapsed_ms": millis(report.load.elapsed),
        },
        "filter_enabled": mode_json(&report.enabled),
        "filter_disabled": mode_json(&report.disabled),
        "speedup": report.speedup(),
    })
}

fn mode_json(mode: &ModeSummary) -> Value {
    let trials: Vec<Value> = mode
        .trials
        .iter()
        .map(|t| {
            json!({
                "elapsed_ms": millis(t.elapsed),
                "hits": t.hits,
                "misses": t.misses,
                "hit_rate": t.hit_rate(),
            })
        })
        .collect();
    json!({
        "avg_elapsed_ms": millis(mode.avg_elapsed()),
        "hits": mode.hits(),
        "misses": mode.misses(),
        "hit_rate": mode.hit_rate(),
        "trials": trials,
    })
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub fn format_duration(d: Duration) -> String {
    let ms = millis(d);
    if ms < 0.001 {
        format!("{:.1} ns", ms * 1_000_000.0)
    } else if ms < 1.0 {
        format!("{:.1} µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.1} ms", ms)
    } else {
        format!("{:.2} s", ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(filter_enabled: bool, ms: &[u64]) -> ModeSummary {
        ModeSummary {
            filter_enabled,
            trials: ms
                .iter()
                .map(|&m| TrialResult {
                    elapsed: Duration::from_millis(m),
                    hits: 80,
                    misses: 20,
                })
                .collect(),
        }
    }

    fn report() -> BenchReport {
        BenchReport {
            load: LoadReport {
                written: 1000,
                elapsed: Duration::from_millis(250),
            },
            enabled: mode(true, &[10, 10]),
            disabled: mode(false, &[30, 30]),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500.0 ns");
        assert_eq!(format_duration(Duration::from_micros(250)), "250.0 µs");
        assert_eq!(format_duration(Duration::from_millis(42)), "42.0 ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50 s");
    }

    #[test]
    fn test_json_report_fields() {
        let v = report_json(&report(), 7);
        assert_eq!(v["seed"], 7);
        assert_eq!(v["load"]["entries"], 1000);
        assert_eq!(v["filter_enabled"]["hits"], 160);
        assert_eq!(v["filter_disabled"]["misses"], 40);
        assert_eq!(v["filter_enabled"]["trials"].as_array().unwrap().len(), 2);
        let speedup = v["speedup"].as_f64().unwrap();
        assert!((speedup - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_speedup_null_when_unmeasurable() {
        let mut r = report();
        r.enabled = mode(true, &[0]);
        let v = report_json(&r, 1);
        assert!(v["speedup"].is_null());
    }
}
