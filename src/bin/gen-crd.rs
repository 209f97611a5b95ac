use fleet_rollout::crd::{Fleet, FleetReplicaSet};
use kube::CustomResourceExt;
use serde_json::{json, Value};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    // Use: cargo run --bin gen-crd | python3 -c "import sys,json,yaml; print(yaml.dump(json.load(sys.stdin), default_flow_style=False))"
    // to convert to YAML
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let crds: Vec<Value> = vec![
        serde_json::to_value(Fleet::crd())?,
        serde_json::to_value(FleetReplicaSet::crd())?,
    ];
    info!(count = crds.len(), "Generated CRDs");

    let list = json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": crds,
    });

    let json_output = serde_json::to_string_pretty(&list)?;
    println!("{}", json_output);
    Ok(())
}
