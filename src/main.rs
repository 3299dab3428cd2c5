use anyhow::{anyhow, bail, Context, Result};
use portfutures::core::{wait_for_any_timeout, Future, FutureError};
use portfutures::engine::{DataTypeRegistry, PipelineWiring};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RENDERERS: usize = 3;
const RENDERER_POLL: Duration = Duration::from_millis(100);

/// Partial histogram produced by one render stage over a share of the view
#[derive(Debug, Clone, Default)]
struct Histogram {
    bins: Vec<u64>,
    area: f32,
}

impl Histogram {
    fn merge(&mut self, other: &Histogram) {
        if self.bins.len() < other.bins.len() {
            self.bins.resize(other.bins.len(), 0);
        }
        for (bin, count) in self.bins.iter_mut().zip(&other.bins) {
            *bin += count;
        }
        self.area += other.area;
    }

    fn is_complete(&self) -> bool {
        (1.0 - self.area).abs() <= 0.0001
    }
}

fn wiring_config() -> serde_json::Value {
    let mut stages: Vec<serde_json::Value> = (0..RENDERERS)
        .map(|i| {
            serde_json::json!({
                "id": format!("render_{}", i),
                "outputs": [{"name": "histogram", "type": "Histogram"}]
            })
        })
        .collect();
    stages.push(serde_json::json!({
        "id": "merge",
        "inputs": [{"name": "histogram", "type": "Histogram"}],
        "outputs": [{"name": "total", "type": "Histogram"}]
    }));

    let connections: Vec<serde_json::Value> = (0..RENDERERS)
        .map(|i| serde_json::json!({"from": format!("render_{}.histogram", i), "to": "merge.histogram"}))
        .collect();

    serde_json::json!({ "stages": stages, "connections": connections })
}

fn run_stages(wiring: &PipelineWiring) -> Result<()> {
    std::thread::scope(|scope| -> Result<()> {
        let mut renderers = Vec::with_capacity(RENDERERS);
        for i in 0..RENDERERS {
            let stage = wiring
                .stage(&format!("render_{}", i))
                .ok_or_else(|| anyhow!("render stage {} missing", i))?;
            renderers.push(scope.spawn(move || -> Result<()> {
                std::thread::sleep(Duration::from_millis(40 * (RENDERERS - i) as u64));
                let partial = Histogram {
                    bins: vec![i as u64 + 1; 8],
                    area: 1.0 / RENDERERS as f32,
                };
                stage
                    .output("histogram")?
                    .set(partial)
                    .with_context(|| format!("{} failed to publish its histogram", stage.id()))
            }));
        }

        let merge = wiring
            .stage("merge")
            .ok_or_else(|| anyhow!("merge stage missing"))?;
        let inputs = merge.in_futures()?;
        let mut total = Histogram::default();

        // Fold partial results as they arrive instead of joining on the slowest renderer
        while !total.is_complete() {
            let pending: Vec<Future> = inputs
                .get_futures("histogram")?
                .into_iter()
                .filter(|future| !future.is_ready())
                .collect();
            if !pending.is_empty() {
                match wait_for_any_timeout(&pending, RENDERER_POLL) {
                    Ok(_) | Err(FutureError::Timeout { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            for partial in inputs.take_ready::<Histogram>("histogram")? {
                total.merge(&partial);
                tracing::info!(area = total.area, "merged partial histogram");
            }

            // A renderer that exited without publishing leaves its input pending forever
            let (finished, running): (Vec<_>, Vec<_>) =
                renderers.into_iter().partition(|renderer| renderer.is_finished());
            renderers = running;
            for renderer in finished {
                renderer
                    .join()
                    .map_err(|_| anyhow!("render stage panicked"))??;
            }
            if pending.is_empty() && !total.is_complete() {
                bail!("every partial histogram arrived but they cover an area of {}", total.area);
            }
        }

        merge.output("total")?.set(total)?;
        Ok(())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let types = DataTypeRegistry::with_primitives().with::<Histogram>("Histogram");
    let wiring = Arc::new(PipelineWiring::from_json(wiring_config(), &types)?);

    let outputs = wiring
        .stage("merge")
        .ok_or_else(|| anyhow!("merge stage missing"))?
        .out_futures()?;

    let mut stages = {
        let wiring = wiring.clone();
        tokio::task::spawn_blocking(move || run_stages(&wiring))
    };

    // The stages only return early on failure, in which case "total" is never set
    let joined = tokio::select! {
        result = &mut stages => {
            result??;
            true
        }
        waited = outputs.wait_async("total") => {
            waited?;
            false
        }
    };

    let total = outputs.get::<Histogram>("total")?;
    tracing::info!(bins = ?total.bins, area = total.area, "histogram complete");

    if !joined {
        stages.await??;
    }
    Ok(())
}
