use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use interview_core::model::{Difficulty, ExtractedFields, Slot};

use crate::collaborator::{Collaborator, Evaluation, ResumeDocument};
use crate::error::CollaboratorError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct HttpCollaboratorConfig {
    pub base_url: String,
}

impl HttpCollaboratorConfig {
    /// Reads the backend base URL from `INTERVIEW_API_BASE_URL`, falling back
    /// to the local development server.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("INTERVIEW_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5000".into());
        Self { base_url }
    }
}

/// `Collaborator` implementation over the interview backend's HTTP API.
#[derive(Clone)]
pub struct HttpCollaborator {
    client: Client,
    config: HttpCollaboratorConfig,
}

impl HttpCollaborator {
    /// Builds a client from the environment configuration.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Http` if the underlying client cannot be
    /// constructed.
    pub fn from_env() -> Result<Self, CollaboratorError> {
        Self::new(HttpCollaboratorConfig::from_env())
    }

    /// Builds a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Http` if the underlying client cannot be
    /// constructed.
    pub fn new(config: HttpCollaboratorConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Verifies the backend is reachable before an interview starts.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` when the backend is down or unhealthy.
    pub async fn health_check(&self) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .get(self.url("/api/interview/health"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Collaborator for HttpCollaborator {
    async fn extract_identity(
        &self,
        document: &ResumeDocument,
    ) -> Result<ExtractedFields, CollaboratorError> {
        let part = multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone());
        let form = multipart::Form::new().part("resume", part);

        let response = self
            .client
            .post(self.url("/api/interview/upload"))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }

        let body: UploadResponse = response.json().await?;
        if !body.success {
            return Err(CollaboratorError::Rejected(
                body.error.unwrap_or_else(|| "extraction failed".into()),
            ));
        }
        let data = body.data.unwrap_or_default();
        Ok(ExtractedFields {
            name: data.name,
            email: data.email,
            phone: data.phone,
            resume_text: body.resume_text.unwrap_or_default(),
        })
    }

    async fn generate_question(
        &self,
        difficulty: Difficulty,
        question_number: u32,
        previous_questions: &[String],
        resume_text: &str,
    ) -> Result<String, CollaboratorError> {
        let payload = QuestionRequest {
            difficulty: difficulty.as_str(),
            question_number,
            previous_questions,
            resume_text,
        };

        let response = self
            .client
            .post(self.url("/api/interview/question"))
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }

        let body: QuestionResponse = response.json().await?;
        if !body.success {
            return Err(CollaboratorError::Rejected(
                body.error.unwrap_or_else(|| "question generation failed".into()),
            ));
        }
        body.question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| CollaboratorError::InvalidResponse("empty question".into()))
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        difficulty: Difficulty,
    ) -> Result<Evaluation, CollaboratorError> {
        let payload = EvaluateRequest {
            question,
            answer,
            difficulty: difficulty.as_str(),
        };

        let response = self
            .client
            .post(self.url("/api/interview/evaluate"))
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }

        let body: EvaluateResponse = response.json().await?;
        let evaluation = body.evaluation.unwrap_or_default();
        Ok(Evaluation {
            score: evaluation.score,
            feedback: evaluation.feedback,
        })
    }

    async fn generate_summary(
        &self,
        candidate_name: &str,
        slots: &[Slot],
        total_score: u32,
    ) -> Result<Option<String>, CollaboratorError> {
        let payload = SummaryRequest {
            candidate_data: CandidateData {
                name: candidate_name,
                questions_and_answers: slots,
                total_score,
            },
        };

        let response = self
            .client
            .post(self.url("/api/interview/summary"))
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }

        let body: SummaryResponse = response.json().await?;
        Ok(body.summary.filter(|s| !s.trim().is_empty()))
    }
}

//
// ─── WIRE TYPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    #[serde(rename = "resumeText")]
    resume_text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadData {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRequest<'a> {
    difficulty: &'static str,
    question_number: u32,
    previous_questions: &'a [String],
    resume_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct QuestionResponse {
    #[serde(default)]
    success: bool,
    question: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    question: &'a str,
    answer: &'a str,
    difficulty: &'static str,
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    evaluation: Option<EvaluationBody>,
}

#[derive(Debug, Default, Deserialize)]
struct EvaluationBody {
    score: Option<u32>,
    feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest<'a> {
    candidate_data: CandidateData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateData<'a> {
    name: &'a str,
    questions_and_answers: &'a [Slot],
    total_score: u32,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: Option<String>,
}
