use anyhow::Context;
use clap::Parser;
use sheet_insight::core::analysis::analysis_service;
use sheet_insight::core::answers::{load_questions, save_questions, AnswerBook};
use sheet_insight::core::ingest::UploadedFile;
use sheet_insight::core::markdown::StyleMap;
use sheet_insight::core::questions::HttpQuestionService;
use sheet_insight::core::summary::SummaryView;
use sheet_insight::domain::model::QuestionId;
use sheet_insight::domain::ports::ConfigProvider;
use sheet_insight::utils::error::InsightError;
use sheet_insight::utils::{logger, validation::Validate};
use sheet_insight::{
    AppConfig, Cli, Command, DocumentQuestions, InsightEngine, InsightPipeline, JsonFileSlotStore,
    LocalStorage, SalesDashboard,
};

fn report(e: &InsightError) -> i32 {
    tracing::error!(
        "❌ sheet-insight failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    e.exit_code()
}

async fn run_dashboard(
    cli: &Cli,
    config: &AppConfig,
    upload: UploadedFile,
) -> sheet_insight::Result<()> {
    let storage = LocalStorage::new(config.output_path());
    let variant = SalesDashboard::new(analysis_service(config.analysis.mode, config));
    let engine = InsightEngine::new_with_monitoring(InsightPipeline::new(storage, variant), cli.monitor);

    let output_path = engine.run(upload).await?;

    if let Some(view) = engine.session().view().await {
        println!("📊 {} records from sheet '{}'", view.metrics.record_count, view.sheet.sheet_name);
        println!("💰 Total Revenue: {}", view.metrics.total_revenue_display());
        println!("📦 Total Units: {}", view.metrics.total_units_display());
        println!("📈 Average Margin: {}", view.metrics.average_margin_display());
    }
    println!("📁 Report saved to: {}", output_path);
    Ok(())
}

async fn run_questions(
    cli: &Cli,
    config: &AppConfig,
    upload: UploadedFile,
) -> sheet_insight::Result<()> {
    let storage = LocalStorage::new(config.output_path());
    let engine =
        InsightEngine::new_with_monitoring(InsightPipeline::new(storage, DocumentQuestions::new()), cli.monitor);

    engine.ingest(upload).await?;

    if config.questions.auto_generate {
        let service = HttpQuestionService::from_config(config, config.questions.contract);
        let count = engine.session().generate_questions(&service).await?;

        // 新題目開始作答，先清掉舊回答
        let store = JsonFileSlotStore::new(config.storage_path());
        let mut book = AnswerBook::new(store.clone(), config.answers_key(), config.storage.persist);
        if let Some(view) = engine.session().view().await {
            save_questions(&store, &view.questions)?;
            book.initialize(&view.questions);
            for question in &view.questions {
                println!(
                    "[{}] ({}, {}) {}",
                    question.id,
                    question.category,
                    "★".repeat(question.importance_stars()),
                    question.question
                );
            }
        }
        book.persist()?;
        println!("🧠 {} questions generated", count);
    }

    let output_path = engine.export().await?;
    println!("📁 Report saved to: {}", output_path);
    Ok(())
}

fn run_answer(config: &AppConfig, id: &str, text: &str) -> sheet_insight::Result<()> {
    let mut book = AnswerBook::load(
        JsonFileSlotStore::new(config.storage_path()),
        config.answers_key(),
        config.storage.persist,
    )?;
    book.set_answer(&QuestionId::new(id), text)?;
    // 單次指令結束即視為離開頁面
    book.navigate()?;
    println!("✅ Saved answer for question {}", id);
    Ok(())
}

fn run_summary(config: &AppConfig) -> sheet_insight::Result<SummaryView> {
    let store = JsonFileSlotStore::new(config.storage_path());
    let questions = load_questions(&store)?;
    let book = AnswerBook::load(store, config.answers_key(), config.storage.persist)?;
    let summary = SummaryView::build(book.answers(), &questions);

    for stat in &summary.quick_stats {
        println!("{}: {}", stat.label, stat.value);
    }
    println!("{}", summary.narrative);
    for response in &summary.responses {
        println!("{}\n  {}", response.label, response.answer);
    }
    Ok(summary)
}

async fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<Result<(), InsightError>> {
    let outcome = match &cli.command {
        Command::Dashboard { file, .. } => match UploadedFile::from_path(file).await {
            Ok(upload) => run_dashboard(cli, config, upload).await,
            Err(e) => Err(e),
        },
        Command::Questions { file, .. } => match UploadedFile::from_path(file).await {
            Ok(upload) => run_questions(cli, config, upload).await,
            Err(e) => Err(e),
        },
        Command::Answer { id, text } => run_answer(config, id, text),
        Command::Summary { html } => match run_summary(config) {
            Ok(summary) => {
                if let Some(path) = html {
                    std::fs::write(path, summary.render_html(&StyleMap::default()))
                        .with_context(|| format!("writing summary page to {}", path.display()))?;
                    println!("📁 Summary page saved to: {}", path.display());
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
    };
    Ok(outcome)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting sheet-insight CLI");

    let mut config = match AppConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => std::process::exit(report(&e)),
    };
    cli.apply_overrides(&mut config);

    if cli.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        std::process::exit(report(&e).max(1));
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&cli, &config).await? {
        Ok(()) => tracing::info!("✅ sheet-insight completed successfully"),
        Err(e) => {
            let exit_code = report(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
