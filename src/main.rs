use micro_particles::core::init_logging;
use micro_particles::{
    EngineResult, Emitter, ParticleConfig, SceneFactory, SceneStage, Ticker, TimerFrameSource,
};
use std::rc::Rc;

/// 运行演示：按配置驱动一个发射器若干帧，输出统计
fn run() -> EngineResult<()> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => ParticleConfig::from_file(path)?,
        None => ParticleConfig::load_or_default(),
    };
    config.apply_env_overrides();
    config.validate()?;

    init_logging(&config.logging);
    tracing::info!(
        target: "demo",
        "Running {} frames at {}ms",
        config.frame.frames,
        config.frame.interval_ms
    );

    let source = Rc::new(TimerFrameSource::new(config.frame.interval()));
    let ticker = Ticker::new(source.clone())?;
    let stage = Rc::new(SceneStage::new());
    let factory = SceneFactory::new(stage.clone(), "circle");

    let mut emitter = Emitter::new(config.emitter.clone(), factory, &ticker)?;
    source.run_frames(config.frame.frames)?;

    let stats = emitter.stats();
    tracing::info!(
        target: "demo",
        "live={} spawned={} culled={} pooled={} hit_rate={:.2}",
        stats.live,
        stats.spawned,
        stats.culled,
        stats.pool.available,
        stats.pool.hit_rate()
    );
    tracing::info!(target: "demo", "{} sprites on stage", stage.len());

    emitter.destroy();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Particle demo failed: {}", e);
        std::process::exit(1);
    }
}
