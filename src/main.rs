use dotenv::dotenv;
use prompt_designer::ai::agents::{GeminiEvaluator, GeminiVariantGenerator};
use prompt_designer::ai::client::GeminiClient;
use prompt_designer::ai::heuristic::HeuristicEvaluator;
use prompt_designer::ai::ports::{Bounded, Evaluator, VariantGenerator};
use prompt_designer::ai::template::TemplateGenerator;
use prompt_designer::config::DesignerConfig;
use prompt_designer::{DesignerError, WorkflowController, report};
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "usage: prompt-designer <task context> [--role <persona>] [--variant <n>]";

#[derive(Debug, PartialEq)]
struct CliArgs {
    task_context: String,
    role: Option<String>,
    variant: usize,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, DesignerError> {
        let mut args = args.into_iter();
        let mut task_context = None;
        let mut role = None;
        let mut variant = 1;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--role" => role = Some(args.next().ok_or_else(|| usage("--role needs a value"))?),
                "--variant" => {
                    let raw = args.next().ok_or_else(|| usage("--variant needs a value"))?;
                    variant = raw
                        .parse()
                        .ok()
                        .filter(|n| *n >= 1)
                        .ok_or_else(|| usage(&format!("--variant must be a positive number, got '{raw}'")))?;
                }
                flag if flag.starts_with("--") => return Err(usage(&format!("unknown flag {flag}"))),
                _ if task_context.is_none() => task_context = Some(arg),
                _ => return Err(usage("only one task context may be given")),
            }
        }

        Ok(Self {
            task_context: task_context.ok_or_else(|| usage("missing task context"))?,
            role,
            variant,
        })
    }
}

fn usage(problem: &str) -> DesignerError {
    DesignerError::InvalidInput(format!("{problem}\n{USAGE}"))
}

fn share_generator<P: VariantGenerator + 'static>(port: P, limit: Option<Duration>) -> Arc<dyn VariantGenerator> {
    match limit {
        Some(limit) => Arc::new(Bounded::new(port, limit)),
        None => Arc::new(port),
    }
}

fn share_evaluator<P: Evaluator + 'static>(port: P, limit: Option<Duration>) -> Arc<dyn Evaluator> {
    match limit {
        Some(limit) => Arc::new(Bounded::new(port, limit)),
        None => Arc::new(port),
    }
}

fn build_ports(config: &DesignerConfig) -> Result<(Arc<dyn VariantGenerator>, Arc<dyn Evaluator>), DesignerError> {
    let limit = config.port_timeout;

    if config.is_offline() {
        let mut generator = TemplateGenerator::new(config.variant_count);
        let mut evaluator = HeuristicEvaluator::new(config.pass_score);
        if let Some(delay) = config.offline_delay {
            generator = generator.with_delay(delay);
            evaluator = evaluator.with_delay(delay);
        }
        return Ok((share_generator(generator, limit), share_evaluator(evaluator, limit)));
    }

    let client = Arc::new(GeminiClient::from_config(config)?);
    Ok((
        share_generator(GeminiVariantGenerator::new(Arc::clone(&client), config.variant_count), limit),
        share_evaluator(GeminiEvaluator::new(client, config.pass_score), limit),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = DesignerConfig::from_env()?;
    let args = CliArgs::parse(std::env::args().skip(1))?;
    let (generator, evaluator) = build_ports(&config)?;

    let role = args.role.unwrap_or_else(|| config.default_role.clone());
    let controller = WorkflowController::new(role, generator, evaluator);
    controller.set_task_context(args.task_context);

    let mut updates = controller.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.is_busy() {
                log::info!("⏳ {}...", snapshot.phase);
            }
        }
    });

    let mode = if config.is_offline() { "offline templates" } else { config.model.as_str() };
    println!("🤖 PROMPT DESIGNER ({mode})");
    println!("📝 Role: {}", controller.snapshot().role);

    controller.generate().await?;
    let snapshot = controller.snapshot();

    let chosen = snapshot
        .variants
        .get(args.variant - 1)
        .ok_or_else(|| usage(&format!("--variant {} but only {} variants exist", args.variant, snapshot.variants.len())))?;
    controller.select_variant(&chosen.id)?;

    println!("\n📦 VARIANTS");
    println!("--------------------------------------------------");
    println!("{}", report::render_variants(&controller.snapshot()));

    match controller.test().await {
        Ok(_) => {
            if let Some(evaluation) = controller.snapshot().evaluation {
                println!("\n🧪 LIVE TEST");
                println!("--------------------------------------------------");
                println!("{}", report::render_evaluation(&evaluation));
            }
        }
        Err(e) => eprintln!("❌ Test failed: {e}"),
    }

    progress.abort();
    Ok(())
}
