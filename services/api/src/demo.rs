use crate::infra::OfflineModel;
use clap::Args;
use nutriscan::config::AppConfig;
use nutriscan::error::AppError;
use nutriscan::workflows::screening::{
    BiometricForm, Field, FileCandidate, HttpScreeningBackend, Panel, ResultPresenter,
    ScreeningService, UploadIntake, ViewModel,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Image file to screen
    pub(crate) image: PathBuf,
    /// Override the model backend base URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
    /// Age in years, used when the image is flagged for assessment
    #[arg(long)]
    pub(crate) age: Option<String>,
    /// Gender (M or F)
    #[arg(long)]
    pub(crate) gender: Option<String>,
    /// Height in centimetres
    #[arg(long)]
    pub(crate) height: Option<String>,
    /// Weight in kilograms
    #[arg(long)]
    pub(crate) weight: Option<String>,
}

impl ScanArgs {
    fn biometrics(&self) -> Option<BiometricForm> {
        Some(BiometricForm::new(
            self.age.clone()?,
            self.gender.clone()?,
            self.height.clone()?,
            self.weight.clone()?,
        ))
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Drop the first classification request to show the retry path.
    #[arg(long)]
    pub(crate) simulate_outage: bool,
    /// Stop after classification instead of running the numeric assessment.
    #[arg(long)]
    pub(crate) skip_assessment: bool,
}

/// Prints every view-model the workflow emits.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsolePresenter;

impl ResultPresenter for ConsolePresenter {
    fn present(&self, view: &ViewModel) {
        render_view(view);
    }
}

fn render_view(view: &ViewModel) {
    if view.busy {
        println!("[{}] waiting for the model backend...", view.stage);
        return;
    }

    println!("[{}]", view.stage);
    if view.upload_prompt_visible {
        println!("  Upload a photo to begin.");
    }
    for (field, value) in &view.field_values {
        println!("  {}: {}", field_label(*field), value);
    }
    for finding in &view.findings {
        println!("  - {}", finding);
    }
    if view.shows(Panel::BiometricForm) {
        println!("  Biometric details required for the numeric assessment.");
    }
    if let Some(notice) = &view.notice {
        println!("  ! {}", notice.message);
    }
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Classification => "Classification",
        Field::Confidence => "Confidence",
        Field::Severity => "Severity",
        Field::Bmi => "BMI",
        Field::Status => "Status",
        Field::WeightStatus => "Weight status",
        Field::HeightStatus => "Height status",
    }
}

pub(crate) async fn run_scan(mut args: ScanArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(backend_url) = args.backend_url.take() {
        config.backend.base_url = backend_url;
    }

    let backend = Arc::new(HttpScreeningBackend::new(&config.backend)?);
    let service = ScreeningService::new(
        UploadIntake::new(config.intake),
        backend.clone(),
        backend,
        Arc::new(ConsolePresenter),
    );

    let candidate = FileCandidate::from_path(&args.image)?;
    let view = service.upload(candidate).await?;
    if !view.shows(Panel::BiometricForm) {
        return Ok(());
    }

    match args.biometrics() {
        Some(form) => {
            service.submit_biometrics(&form).await?;
        }
        None => println!(
            "Pass --age, --gender, --height and --weight to run the numeric assessment."
        ),
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        simulate_outage,
        skip_assessment,
    } = args;

    let script = if simulate_outage {
        vec![Some("Healthy"), None, Some("Malnourished")]
    } else {
        vec![Some("Healthy"), Some("Malnourished")]
    };
    let model = Arc::new(OfflineModel::scripted(script));
    let service = ScreeningService::new(
        UploadIntake::default(),
        model.clone(),
        model,
        Arc::new(ConsolePresenter),
    );

    println!("NutriScan screening demo (offline model)");

    println!("\n1. Healthy photo");
    service.upload(sample_photo("healthy-child.jpg")).await?;

    println!("\n2. Photo flagged for follow-up");
    let view = service.upload(sample_photo("follow-up.jpg")).await?;
    if view.notice.is_some() {
        println!("\n   Retrying classification");
        service.retry_classification().await?;
    }

    if !skip_assessment {
        println!("\n3. Numeric assessment");
        if let Err(err) = service
            .submit_biometrics(&BiometricForm::new("4", "M", "95", "abc"))
            .await
        {
            println!("  Form rejected: {}", err);
        }
        service
            .submit_biometrics(&BiometricForm::new("4", "M", "95", "11.5"))
            .await?;
    }

    println!("\n4. Reset");
    let view = service.reset().await;
    render_view(&view);

    Ok(())
}

fn sample_photo(filename: &str) -> FileCandidate {
    FileCandidate::new(
        filename,
        "image/jpeg",
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46],
    )
}
