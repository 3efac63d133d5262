//! Smoke run of the coordinator.
//!
//! ```bash
//! cargo run --example smoke -- --log_dir /tmp/smoke --cluster staging
//! ```

use anyhow::{ensure, Result};
use clap::Arg;
use journal_runner::config::{Bindings, DefaultBindingOverrides, ParserInit};
use journal_runner::executor::{ParallelEngine, RunnerContext, SharedScenario, TestRunner};
use journal_runner::journal::JsonSnapshot;
use journal_runner::models::{TestCase, TestSuiteProvider};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Cluster {
    name: String,
    nodes: Vec<String>,
}

impl SharedScenario for Cluster {
    fn from_bindings(bindings: &Bindings) -> Result<Self> {
        let name = bindings.get_or("CLUSTER", "local").to_string();
        let nodes = (1..=3).map(|i| format!("{name}-node{i}")).collect();
        Ok(Self { name, nodes })
    }
}

struct ClusterTests;

impl TestSuiteProvider for ClusterTests {
    fn name(&self) -> &str {
        "cluster"
    }

    fn produce_test_cases(&self) -> Vec<TestCase> {
        vec![
            TestCase::new("cluster", "has_nodes", |ctx| {
                let cluster = ctx.get_shared::<Cluster>()?;
                ctx.report(&JsonSnapshot::of("cluster", cluster.as_ref())?)?;
                ensure!(!cluster.nodes.is_empty(), "cluster {} has no nodes", cluster.name);
                Ok(())
            }),
            TestCase::new("cluster", "node_names", |ctx| {
                let cluster = ctx.get_shared::<Cluster>()?;
                for node in &cluster.nodes {
                    assert!(node.starts_with(&cluster.name), "unexpected node {node}");
                }
                Ok(())
            }),
        ]
    }
}

struct BindingTests;

impl TestSuiteProvider for BindingTests {
    fn name(&self) -> &str {
        "bindings"
    }

    fn produce_test_cases(&self) -> Vec<TestCase> {
        vec![TestCase::new("bindings", "dump", |ctx| {
            ctx.report(&JsonSnapshot::of("bindings", &ctx.bindings())?)?;
            Ok(())
        })]
    }
}

fn main() -> Result<()> {
    let cluster_flag: ParserInit = Box::new(|cmd, defaults| {
        cmd.arg(
            Arg::new("cluster")
                .long("cluster")
                .default_value(defaults.get_or("CLUSTER", "local"))
                .help("Cluster the smoke tests run against"),
        )
    });

    let providers: Vec<Box<dyn TestSuiteProvider>> =
        vec![Box::new(ClusterTests), Box::new(BindingTests)];

    let failures = TestRunner::main(
        RunnerContext::new(),
        Some(Box::new(ParallelEngine::new(2))),
        vec![cluster_flag],
        Some(DefaultBindingOverrides::new().with("LOG_FILEBASE", "smoke")),
        &providers,
    )?;
    std::process::exit(failures.min(255) as i32);
}
