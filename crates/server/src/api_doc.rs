use utoipa::OpenApi;

use crate::api::{self, utils::SecurityApiAccountIdDefault};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::media::put_moderated_image,
        api::account::get_ban_info,
        api::account_admin::post_unban,
        api::account_admin::get_violations,
    ),
    components(schemas(
        api::media::ContentUrl,
        api::media::ImageRejected,
        model::AccountId,
        model::UnixTime,
        model::Likelihood,
        model::ModerationResult,
        model::ViolationSeverity,
        model::ViolationRecord,
        model::ViolationList,
        model::BanInfo,
        model::BanState,
        model::BanDenial,
    )),
    modifiers(&SecurityApiAccountIdDefault),
    info(
        title = "moderation-backend",
        description = "Image moderation and account sanction API",
        version = "0.1.0",
        license(
            name = "",
            url = "https://example.com"
        ),
    ),
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn open_api_json_string() -> Result<String, serde_json::Error> {
        ApiDoc::openapi().to_pretty_json()
    }
}
