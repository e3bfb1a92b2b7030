use std::fs;
use std::path::PathBuf;

use applypilot_core::config::{AppConfig, LoadOptions};
use applypilot_core::tailor::{TailorEngine, TailorError};
use applypilot_core::JobPosting;
use serde::Serialize;

use super::{serialize_payload, CommandResult};

#[derive(Debug, Clone)]
pub struct TailorArgs {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub description_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct TailorPayload {
    command: String,
    status: String,
    job_id: String,
    title: String,
    company: String,
    resume_path: String,
}

pub fn run(load: LoadOptions, args: TailorArgs, json: bool) -> CommandResult {
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("tailor", "config_validation", error.to_string(), 2)
        }
    };

    let engine = match TailorEngine::from_config(&config.resume, &config.qa) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure("tailor", "tailor_setup", error.to_string(), 2)
        }
    };

    let description = match read_description(&args) {
        Ok(description) => description,
        Err(message) => {
            return CommandResult::failure("tailor", "invalid_argument", message, 2)
        }
    };

    let mut job = JobPosting::new(args.job_id, args.title);
    job.company = args.company;
    job.location = args.location;
    job.url = args.url;
    job.description = description;

    let artifact = match engine.tailor(&job) {
        Ok(artifact) => artifact,
        Err(error @ TailorError::Template(_)) => {
            return CommandResult::failure("tailor", "template_render", error.to_string(), 1)
        }
        Err(error) => {
            return CommandResult::failure("tailor", "artifact_write", error.to_string(), 1)
        }
    };

    if json {
        let payload = TailorPayload {
            command: "tailor".to_string(),
            status: "ok".to_string(),
            job_id: job.id.0.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            resume_path: artifact.path.display().to_string(),
        };
        CommandResult::ok(serialize_payload(&payload))
    } else {
        CommandResult::ok(artifact.path.display().to_string())
    }
}

fn read_description(args: &TailorArgs) -> Result<String, String> {
    if let Some(path) = &args.description_file {
        return fs::read_to_string(path)
            .map_err(|error| format!("could not read --description-file `{}`: {error}", path.display()));
    }
    Ok(args.description.clone())
}
