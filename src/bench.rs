//! Baseline benchmark
//!
//! Starts `runs` concurrent runs, each fanning out over `width` sleeps of
//! `latency_ms`, and reports wall time and throughput. Everything happens in
//! process; the numbers measure scheduler overhead on top of the timers.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};
use tracing::info;

use crate::demos::fan_out_sleeps;
use crate::scheduler::Scheduler;

pub struct BenchParams {
    pub runs: usize,
    pub width: usize,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub runs: usize,
    pub width: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// Mean time from start of a run to its outcome
    pub mean_latency: Duration,
}

impl BenchReport {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.completed as f64 / secs
    }
}

pub async fn run_benchmark(params: BenchParams, scheduler: &Scheduler) -> Result<BenchReport> {
    validate_params(&params)?;

    println!("🚀 Starting Cadence Benchmark");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\n📋 Configuration:");
    println!("   Runs: {}", params.runs);
    println!("   Fan-out width: {}", params.width);
    println!("   Latency: {}ms", params.latency_ms);

    let report = measure(&params, scheduler).await?;
    display_report(&report);
    Ok(report)
}

fn validate_params(params: &BenchParams) -> Result<()> {
    if params.runs == 0 {
        return Err(anyhow!("Must have at least 1 run"));
    }
    if params.width == 0 {
        return Err(anyhow!("Fan-out width must be at least 1"));
    }
    Ok(())
}

async fn measure(params: &BenchParams, scheduler: &Scheduler) -> Result<BenchReport> {
    let start = Instant::now();

    let handles: Vec<_> = (0..params.runs)
        .map(|_| {
            let scheduler = scheduler.clone();
            let factory = fan_out_sleeps(vec![params.latency_ms; params.width], Vec::new());
            tokio::spawn(async move {
                let started = Instant::now();
                let outcome = scheduler.run_async(factory, Vec::new()).await;
                (outcome.is_ok(), started.elapsed())
            })
        })
        .collect();

    let mut completed = 0;
    let mut failed = 0;
    let mut total_latency = Duration::ZERO;
    for handle in handles {
        let (ok, latency) = handle.await?;
        total_latency += latency;
        if ok {
            completed += 1;
        } else {
            failed += 1;
        }
    }

    let elapsed = start.elapsed();
    info!(runs = params.runs, completed, failed, elapsed_ms = elapsed.as_millis() as u64, "benchmark finished");

    Ok(BenchReport {
        runs: params.runs,
        width: params.width,
        completed,
        failed,
        elapsed,
        mean_latency: mean_latency(total_latency, params.runs),
    })
}

fn mean_latency(total: Duration, runs: usize) -> Duration {
    if runs == 0 {
        return Duration::ZERO;
    }
    total.div_f64(runs as f64)
}

fn display_report(report: &BenchReport) {
    println!("\n");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Benchmark Results");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("⏱️  Duration: {:.2}s", report.elapsed.as_secs_f64());
    println!();
    println!("📋 Work:");
    println!("   Runs: {} x {} operations", report.runs, report.width);
    println!("   Completed: {}", report.completed);
    println!("   Failed: {}", report.failed);
    println!();
    println!("🚀 Throughput: {:.1} runs/sec", report.throughput());
    println!();
    println!("📈 Average Latency: {:.1}ms", report.mean_latency.as_secs_f64() * 1000.0);
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_benchmark_completes_all_runs() {
        let params = BenchParams {
            runs: 8,
            width: 4,
            latency_ms: 10,
        };

        let report = measure(&params, &Scheduler::default()).await.unwrap();

        assert_eq!(report.completed, 8);
        assert_eq!(report.failed, 0);
        assert!(report.mean_latency >= Duration::from_millis(10));
        assert!(report.throughput() > 0.0);
    }

    #[test]
    fn test_rejects_empty_benchmark() {
        let params = BenchParams {
            runs: 0,
            width: 4,
            latency_ms: 10,
        };
        assert!(validate_params(&params).is_err());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_mean_latency_beyond_u32_runs() {
        let runs = 1usize << 33;
        let total = Duration::from_secs(1 << 33);
        assert_eq!(mean_latency(total, runs), Duration::from_secs(1));
        assert_eq!(mean_latency(total, 0), Duration::ZERO);
    }
}
