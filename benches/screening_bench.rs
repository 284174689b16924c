// Screening throughput benchmark
// Measures fence stripping + splitting + static screening per record, the work done
// for every record before any process is spawned.
// Target: p95 < 2ms for a typical candidate, p95 < 50ms at the size ceiling

use std::time::{Duration, Instant};

use verifybox::safety::denylist::Denylist;
use verifybox::safety::scanner::SafetyScanner;
use verifybox::split::fence::strip_code_fences;
use verifybox::split::splitter::CodeTestSplitter;

const ITERATIONS: usize = 500;
const WARMUP_ITERATIONS: usize = 50;

/// Latency percentiles
struct LatencyStats {
    p50: Duration,
    p95: Duration,
    p99: Duration,
    min: Duration,
    max: Duration,
    mean: Duration,
}

impl LatencyStats {
    fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort();
        let len = samples.len();

        let p50_idx = (len as f64 * 0.50) as usize;
        let p95_idx = (len as f64 * 0.95) as usize;
        let p99_idx = (len as f64 * 0.99) as usize;

        let sum: Duration = samples.iter().sum();
        let mean = sum / len as u32;

        Self {
            p50: samples[p50_idx],
            p95: samples[p95_idx],
            p99: samples[p99_idx],
            min: samples[0],
            max: samples[len - 1],
            mean,
        }
    }

    fn print(&self, label: &str) {
        println!("\n{}", label);
        println!("  p50: {:?}", self.p50);
        println!("  p95: {:?}", self.p95);
        println!("  p99: {:?}", self.p99);
        println!("  min: {:?}", self.min);
        println!("  max: {:?}", self.max);
        println!("  mean: {:?}", self.mean);
    }
}

struct BenchmarkResult {
    scenario: String,
    stats: LatencyStats,
    budget: Duration,
}

impl BenchmarkResult {
    fn passed(&self) -> bool {
        self.stats.p95 < self.budget
    }

    fn print(&self) {
        println!("\n=== {} ===", self.scenario);
        self.stats.print("Latency");

        if self.passed() {
            println!("PASS");
        } else {
            println!("FAIL: p95={:?} (target <{:?})", self.stats.p95, self.budget);
        }
    }
}

fn typical_candidate() -> String {
    let mut text = String::from("Here is the implementation:\n\n```python\n");
    for i in 0..40 {
        text.push_str(&format!(
            "def helper_{i}(values):\n    total = 0\n    for v in values:\n        total += v * {i}\n    return total\n\n"
        ));
    }
    text.push_str("def test_helper_0():\n    assert helper_0([1, 2]) == 0\n```\n");
    text
}

fn ceiling_candidate() -> String {
    let line = "x = [i * i for i in range(10) if i % 3]  # padding\n";
    let mut text = String::new();
    while text.len() + line.len() < 99_000 {
        text.push_str(line);
    }
    text.push_str("def test_x():\n    assert x\n");
    text
}

fn measure(scenario: &str, text: &str, budget: Duration) -> BenchmarkResult {
    let splitter = CodeTestSplitter::with_default_rules().expect("default split rules compile");
    let scanner = SafetyScanner::new(&Denylist::default()).expect("default denylist compiles");

    let run = || {
        let payload = strip_code_fences(text);
        let split = splitter.split(&payload);
        scanner.scan(&split.code)
    };

    for _ in 0..WARMUP_ITERATIONS {
        let _ = run();
    }

    let mut samples = Vec::with_capacity(ITERATIONS);
    for _ in 0..ITERATIONS {
        let start = Instant::now();
        let violation = run();
        samples.push(start.elapsed());
        assert!(violation.is_none(), "benchmark candidate must screen clean");
    }

    BenchmarkResult {
        scenario: scenario.to_string(),
        stats: LatencyStats::from_samples(samples),
        budget,
    }
}

fn main() {
    println!("=== verifybox Screening Benchmark ===");
    println!("Iterations: {} (after {} warmup)", ITERATIONS, WARMUP_ITERATIONS);

    let results = vec![
        measure("typical fenced candidate", &typical_candidate(), Duration::from_millis(2)),
        measure("candidate at size ceiling", &ceiling_candidate(), Duration::from_millis(50)),
    ];

    for result in &results {
        result.print();
    }

    let passed_count = results.iter().filter(|r| r.passed()).count();
    let total_count = results.len();

    println!("\n=== Summary ===");
    println!("{}/{} scenarios passed", passed_count, total_count);

    if passed_count == total_count {
        println!("All screening budgets met");
        std::process::exit(0);
    } else {
        println!("Some screening budgets exceeded");
        std::process::exit(1);
    }
}
