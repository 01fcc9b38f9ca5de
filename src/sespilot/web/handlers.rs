use super::{blocking, ApiError, ServeClient, ServeStore, SharedApi};
use crate::api::{ConfigAction, NewTemplate, SendOptions, TemplateUpdate};
use crate::commands::CmdResult;
use crate::error::SesPilotError;
use crate::model::{TemplateCounts, TemplateKind, TemplateNode};
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

type Reply = Result<Json<CmdResult>, ApiError>;
type JsonBody<T> = Result<Json<T>, JsonRejection>;
type QueryParams<T> = Result<Query<T>, QueryRejection>;

/// Bodies the dashboard may leave out; empty means defaults.
fn optional_body<T: Default + DeserializeOwned>(bytes: &Bytes) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError(SesPilotError::InvalidInput(format!("Invalid request body: {}", e))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[serde(default)]
    pub parent_path: String,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub template_name: Option<String>,
}

impl CreateTemplateRequest {
    fn into_new(self) -> NewTemplate {
        let new = NewTemplate::new(self.name, self.subject).in_folder(self.parent_path);
        match self.template_name {
            Some(name) => new.with_template_name(name),
            None => new,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub remote: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestEmailRequest {
    pub email: Option<String>,
    pub from: Option<String>,
}

impl From<TestEmailRequest> for SendOptions {
    fn from(req: TestEmailRequest) -> Self {
        SendOptions {
            to: req.email,
            from: req.from,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationAction {
    Deploy,
    Update,
    TestEmail,
}

#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub action: VerificationAction,
}

/// Body for `?action=`; which fields matter depends on the action.
#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    #[serde(flatten)]
    pub update: TemplateUpdate,
    pub email: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub template_name: Option<String>,
    #[serde(default)]
    pub template_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub parent_path: String,
    pub folder_name: String,
    #[serde(default = "email_kind")]
    pub kind: TemplateKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub path: String,
    pub new_name: String,
    #[serde(default = "email_kind")]
    pub kind: TemplateKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItemRequest {
    pub path: String,
    #[serde(default = "email_kind")]
    pub kind: TemplateKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub template_path: String,
    #[serde(default)]
    pub target_folder: String,
    #[serde(default = "email_kind")]
    pub kind: TemplateKind,
}

fn email_kind() -> TemplateKind {
    TemplateKind::Email
}

pub async fn show_config<S: ServeStore, C: ServeClient>(State(api): State<SharedApi<S, C>>) -> Reply {
    blocking(api, |api| api.config(ConfigAction::ShowAll)).await.map(Json)
}

pub async fn list_templates<S: ServeStore, C: ServeClient>(State(api): State<SharedApi<S, C>>) -> Reply {
    blocking(api, |api| api.list_templates()).await.map(Json)
}

pub async fn list_verification<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
) -> Result<Json<Vec<TemplateNode>>, ApiError> {
    let result = blocking(api, |api| api.list_templates()).await?;
    Ok(Json(result.listing.map(|l| l.verification).unwrap_or_default()))
}

pub async fn template_counts<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
) -> Result<Json<TemplateCounts>, ApiError> {
    blocking(api, |api| api.template_counts()).await.map(Json)
}

pub async fn sync_status<S: ServeStore, C: ServeClient>(State(api): State<SharedApi<S, C>>) -> Reply {
    blocking(api, |api| {
        api.sync_status(&[TemplateKind::Email, TemplateKind::Verification])
    })
    .await
    .map(Json)
}

pub async fn create_email<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<CreateTemplateRequest>,
) -> Reply {
    let Json(req) = body?;
    create(api, TemplateKind::Email, req).await
}

pub async fn create_verification<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<CreateTemplateRequest>,
) -> Reply {
    let Json(req) = body?;
    create(api, TemplateKind::Verification, req).await
}

async fn create<S: ServeStore, C: ServeClient>(
    api: SharedApi<S, C>,
    kind: TemplateKind,
    req: CreateTemplateRequest,
) -> Reply {
    blocking(api, move |api| api.create_template(kind, req.into_new()))
        .await
        .map(Json)
}

pub async fn show_email<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
) -> Reply {
    blocking(api, move |api| api.show_template(TemplateKind::Email, &path))
        .await
        .map(Json)
}

pub async fn show_verification<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
) -> Reply {
    blocking(api, move |api| api.show_template(TemplateKind::Verification, &path))
        .await
        .map(Json)
}

pub async fn update_email<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
    body: JsonBody<TemplateUpdate>,
) -> Reply {
    let Json(update) = body?;
    blocking(api, move |api| api.update_template(TemplateKind::Email, &path, update))
        .await
        .map(Json)
}

pub async fn update_verification<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
    body: JsonBody<TemplateUpdate>,
) -> Reply {
    let Json(update) = body?;
    blocking(api, move |api| {
        api.update_template(TemplateKind::Verification, &path, update)
    })
    .await
    .map(Json)
}

pub async fn delete_email<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
    params: QueryParams<DeleteQuery>,
) -> Reply {
    let Query(query) = params?;
    blocking(api, move |api| {
        api.delete_template(TemplateKind::Email, &path, query.remote)
    })
    .await
    .map(Json)
}

pub async fn delete_verification<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
    params: QueryParams<DeleteQuery>,
) -> Reply {
    let Query(query) = params?;
    blocking(api, move |api| {
        api.delete_template(TemplateKind::Verification, &path, query.remote)
    })
    .await
    .map(Json)
}

pub async fn deploy_email<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
) -> Reply {
    blocking(api, move |api| api.deploy(TemplateKind::Email, &path))
        .await
        .map(Json)
}

pub async fn test_email<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
    body: Bytes,
) -> Reply {
    let options: SendOptions = optional_body::<TestEmailRequest>(&body)?.into();
    blocking(api, move |api| api.send_test(TemplateKind::Email, &path, options))
        .await
        .map(Json)
}

pub async fn verification_action<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    Path(path): Path<String>,
    params: QueryParams<ActionQuery>,
    body: Bytes,
) -> Reply {
    let Query(query) = params?;
    let body: ActionBody = optional_body(&body)?;
    let kind = TemplateKind::Verification;
    tracing::debug!(action = ?query.action, %path, "verification action");

    blocking(api, move |api| match query.action {
        VerificationAction::Deploy => api.deploy(kind, &path),
        VerificationAction::Update => api.update_template(kind, &path, body.update),
        VerificationAction::TestEmail => api.send_test(
            kind,
            &path,
            SendOptions {
                to: body.email,
                from: body.from,
            },
        ),
    })
    .await
    .map(Json)
}

pub async fn pull<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<PullRequest>,
) -> Reply {
    let Json(req) = body?;
    let mut names = req.template_names;
    names.extend(req.template_name);
    blocking(api, move |api| api.pull(&names[..])).await.map(Json)
}

pub async fn pull_all<S: ServeStore, C: ServeClient>(State(api): State<SharedApi<S, C>>) -> Reply {
    blocking(api, |api| api.pull_all()).await.map(Json)
}

/// 401 when the AWS CLI has no usable credentials, as the dashboard expects.
pub async fn permissions<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
) -> Result<Response, ApiError> {
    let result = blocking(api, |api| api.permissions()).await?;
    let configured = result.permissions.as_ref().map_or(false, |p| p.configured);
    let status = if configured {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    Ok((status, Json(result)).into_response())
}

pub async fn create_folder<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<CreateFolderRequest>,
) -> Reply {
    let Json(req) = body?;
    blocking(api, move |api| {
        api.create_folder(req.kind, &req.parent_path, &req.folder_name)
    })
    .await
    .map(Json)
}

pub async fn rename_item<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<RenameRequest>,
) -> Reply {
    let Json(req) = body?;
    blocking(api, move |api| api.rename(req.kind, &req.path, &req.new_name))
        .await
        .map(Json)
}

pub async fn delete_item<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<DeleteItemRequest>,
) -> Reply {
    let Json(req) = body?;
    blocking(api, move |api| api.delete_template(req.kind, &req.path, false))
        .await
        .map(Json)
}

pub async fn move_template<S: ServeStore, C: ServeClient>(
    State(api): State<SharedApi<S, C>>,
    body: JsonBody<MoveRequest>,
) -> Reply {
    let Json(req) = body?;
    blocking(api, move |api| {
        api.move_template(req.kind, &req.template_path, &req.target_folder)
    })
    .await
    .map(Json)
}
