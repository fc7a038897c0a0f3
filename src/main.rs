use mathcoach::config::loader::ConfigLoader;
use mathcoach::models::ProficiencyLevel;
use mathcoach::observability::init_tracing;
use mathcoach::services::create_tutor_service;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load()?;
    ConfigLoader::validate(&config)?;
    let _guard = init_tracing(&config.app_name, &config.logging)?;
    info!(
        "Starting {} ({} environment)",
        config.app_name, config.environment
    );

    let mut tutor = create_tutor_service(&config).await?;

    let student_id = match std::env::args().nth(1) {
        Some(id) => {
            let level = std::env::args()
                .nth(2)
                .map(|l| l.parse::<ProficiencyLevel>())
                .transpose()?
                .unwrap_or(config.student.default_level);
            let profile = tutor.students_mut().get_or_create(&id, level).await?;
            info!("Loaded student {} at level {}", profile.student_id, profile.level);
            profile.student_id
        }
        None => {
            let outcome = tutor.students_mut().create_student(None).await?;
            info!("Created student {}", outcome.profile.student_id);
            outcome.profile.student_id
        }
    };

    let students = tutor.students();
    info!("Sync state: {:?}", students.state(&student_id));

    let recommended = students.recommend_objectives(&student_id)?;
    if recommended.is_empty() {
        info!("No objectives left to recommend");
    }
    for objective in &recommended {
        info!("Recommended objective: {}", objective);
    }

    let progress = tutor.progress(&student_id)?;
    info!("Progress: {}", serde_json::to_string(&progress)?);

    match tutor.next_exercise(&student_id).await {
        Ok(exercise) => info!("Next exercise [{}]: {}", exercise.topic, exercise.prompt),
        Err(e) => warn!("No exercise available: {}", e),
    }

    let report = tutor.students_mut().flush_all().await;
    for (id, e) in &report.failed {
        warn!("Profile {} is still pending sync: {}", id, e);
    }
    info!("Sync metrics:\n{}", tutor.students().metrics().gather());

    Ok(())
}
