//! Tests that the umbrella crate exposes a working surface on its own,
//! including the `Inject` derive resolving paths through `trellis`.

use std::sync::Arc;
use std::time::Duration;
use trellis::prelude::*;

struct Clock;

struct Scheduler {
    clock: Arc<Clock>,
}

#[derive(Default, Inject)]
struct Jobs {
    pub scheduler: Option<Arc<Scheduler>>,
}

fn scheduling(m: &mut ModuleBuilder) -> Result<(), ModuleError> {
    m.provide(|| Clock)?;
    m.provide(|clock: Arc<Clock>| Scheduler { clock })?;
    Ok(())
}

#[test]
fn derive_through_umbrella() {
    let mut jobs = Jobs::default();
    fill(&mut jobs, module_fn("scheduling", scheduling)).unwrap();

    let scheduler = jobs.scheduler.expect("scheduler filled");
    let graph = build_graph(module_fn("scheduling", scheduling)).unwrap();
    assert!(graph.contains::<Clock>());
    assert!(Arc::strong_count(&scheduler.clock) >= 1);
}

#[tokio::test]
async fn app_through_umbrella() {
    let app = App::new(module_fn("scheduling", scheduling)).unwrap();
    app.start(Duration::from_secs(1)).await.unwrap();
    app.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(app.state(), AppState::Stopped);
}
