//! Google Cloud Vision image annotation client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use config::{ClassifierCredentials, ImageModerationSettings};
use error_stack::{Result, ResultExt};
use model::{Likelihood, ModerationResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use utils::ContextExt;

use crate::{ClassifierError, ImageClassifier, auth::VisionAuth};

const FEATURE_SAFE_SEARCH_DETECTION: &str = "SAFE_SEARCH_DETECTION";
const FEATURE_OBJECT_LOCALIZATION: &str = "OBJECT_LOCALIZATION";

/// Object names which count as weapons. Names are compared word by word
/// so "Kitchen knife" and "Machine gun" also match.
const WEAPON_OBJECT_NAMES: &[&str] = &[
    "gun", "guns", "handgun", "pistol", "revolver", "rifle", "shotgun", "firearm", "firearms",
    "weapon", "weapons", "knife", "knives", "dagger", "sword", "machete", "blade",
];

#[derive(Serialize)]
struct AnnotateRequestBody<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 2],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    feature_type: &'a str,
}

#[derive(Deserialize)]
struct AnnotateResponseBody {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    safe_search_annotation: Option<SafeSearchAnnotation>,
    #[serde(default)]
    localized_object_annotations: Vec<LocalizedObjectAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct SafeSearchAnnotation {
    #[serde(default)]
    adult: Likelihood,
    #[serde(default)]
    spoof: Likelihood,
    #[serde(default)]
    medical: Likelihood,
    #[serde(default)]
    violence: Likelihood,
    #[serde(default)]
    racy: Likelihood,
}

#[derive(Deserialize)]
struct LocalizedObjectAnnotation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    score: f32,
}

#[derive(Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

fn is_weapon(object_name: &str) -> bool {
    object_name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| WEAPON_OBJECT_NAMES.contains(&word))
}

/// Convert annotation response JSON to [ModerationResult].
///
/// Safe search violence rating targets gore, so detected weapons with
/// confidence greater than `weapon_confidence_threshold` override the
/// violence rating to [Likelihood::VeryLikely].
pub fn parse_annotate_response(
    response: &[u8],
    weapon_confidence_threshold: f32,
) -> Result<ModerationResult, ClassifierError> {
    let body: AnnotateResponseBody =
        serde_json::from_slice(response).change_context(ClassifierError::InvalidResponse)?;

    let image_response = body
        .responses
        .into_iter()
        .next()
        .ok_or(ClassifierError::InvalidResponse)
        .attach_printable("Response list is empty")?;

    if let Some(error) = image_response.error {
        return Err(ClassifierError::ClassifierUnavailable.report()).attach_printable(format!(
            "API error {}: {}",
            error.code, error.message
        ));
    }

    let safe_search = image_response
        .safe_search_annotation
        .ok_or(ClassifierError::InvalidResponse)
        .attach_printable("Safe search annotation is missing")?;

    let mut result = ModerationResult {
        adult: safe_search.adult,
        violence: safe_search.violence,
        racy: safe_search.racy,
        spoof: safe_search.spoof,
        medical: safe_search.medical,
    };

    let weapon = image_response
        .localized_object_annotations
        .iter()
        .find(|o| o.score > weapon_confidence_threshold && is_weapon(&o.name));

    if let Some(weapon) = weapon {
        debug!(
            "Weapon detected: {}, confidence: {}",
            weapon.name, weapon.score
        );
        result.violence = Likelihood::VeryLikely;
    }

    Ok(result)
}

pub struct GoogleVisionClassifier {
    client: reqwest::Client,
    api_url: Url,
    auth: VisionAuth,
    request_timeout: Duration,
    weapon_confidence_threshold: f32,
}

impl GoogleVisionClassifier {
    /// Create classifier from config. Fails if credentials are
    /// missing or invalid.
    pub fn new(
        settings: &ImageModerationSettings,
        client: reqwest::Client,
    ) -> Result<Self, ClassifierError> {
        let credentials = settings
            .credentials
            .as_ref()
            .ok_or(ClassifierError::InvalidCredentials)
            .attach_printable("Credentials are not configured")?;

        Self::with_credentials(
            settings.api_url.clone(),
            credentials,
            settings.request_timeout,
            settings.weapon_confidence_threshold,
            client,
        )
    }

    pub fn with_credentials(
        api_url: Url,
        credentials: &ClassifierCredentials,
        request_timeout: Duration,
        weapon_confidence_threshold: f32,
        client: reqwest::Client,
    ) -> Result<Self, ClassifierError> {
        let auth = VisionAuth::new(credentials, client.clone())?;
        Ok(Self {
            client,
            api_url,
            auth,
            request_timeout,
            weapon_confidence_threshold,
        })
    }
}

#[async_trait]
impl ImageClassifier for GoogleVisionClassifier {
    async fn classify(&self, image: &[u8]) -> Result<ModerationResult, ClassifierError> {
        let body = AnnotateRequestBody {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(image),
                },
                features: [
                    Feature {
                        feature_type: FEATURE_SAFE_SEARCH_DETECTION,
                    },
                    Feature {
                        feature_type: FEATURE_OBJECT_LOCALIZATION,
                    },
                ],
            }],
        };

        let response = self
            .auth
            .authenticate(self.api_url.clone(), &self.client)
            .await?
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .change_context(ClassifierError::ClassifierUnavailable)?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .change_context(ClassifierError::ClassifierUnavailable)?;

        if !status.is_success() {
            warn!("Image classifier API returned status {status}");
            return Err(ClassifierError::ClassifierUnavailable.report()).attach_printable(
                format!(
                    "Status: {status}, response: {}",
                    String::from_utf8_lossy(&bytes)
                ),
            );
        }

        parse_annotate_response(&bytes, self.weapon_confidence_threshold)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        Json, Router,
        extract::{RawQuery, State},
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::json;

    use super::*;

    const TEST_PRIVATE_KEY: &str = include_str!("../test_data/test_service_account_key.pem");

    fn response_json(violence: &str, objects: serde_json::Value) -> Vec<u8> {
        json!({
            "responses": [{
                "safeSearchAnnotation": {
                    "adult": "VERY_UNLIKELY",
                    "spoof": "VERY_UNLIKELY",
                    "medical": "UNLIKELY",
                    "violence": violence,
                    "racy": "POSSIBLE",
                },
                "localizedObjectAnnotations": objects,
            }]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn safe_search_levels_are_parsed() {
        let result = parse_annotate_response(&response_json("LIKELY", json!([])), 0.5).unwrap();
        assert_eq!(
            result,
            ModerationResult {
                adult: Likelihood::VeryUnlikely,
                violence: Likelihood::Likely,
                racy: Likelihood::Possible,
                spoof: Likelihood::VeryUnlikely,
                medical: Likelihood::Unlikely,
            }
        );
    }

    #[test]
    fn detected_gun_overrides_violence() {
        let objects = json!([{ "name": "Gun", "score": 0.8 }]);
        let result = parse_annotate_response(&response_json("VERY_UNLIKELY", objects), 0.5).unwrap();
        assert_eq!(result.violence, Likelihood::VeryLikely);
    }

    #[test]
    fn weapon_synonyms_override_violence() {
        for name in ["Kitchen knife", "Handgun", "Machine gun", "Sword", "Rifle"] {
            let objects = json!([{ "name": name, "score": 0.9 }]);
            let result =
                parse_annotate_response(&response_json("VERY_UNLIKELY", objects), 0.5).unwrap();
            assert_eq!(result.violence, Likelihood::VeryLikely, "{name}");
        }
    }

    #[test]
    fn low_confidence_weapon_is_ignored() {
        let objects = json!([{ "name": "Gun", "score": 0.5 }]);
        let result = parse_annotate_response(&response_json("UNLIKELY", objects), 0.5).unwrap();
        assert_eq!(result.violence, Likelihood::Unlikely);
    }

    #[test]
    fn other_objects_do_not_override_violence() {
        let objects = json!([{ "name": "Hammer", "score": 0.99 }, { "name": "Gundam", "score": 0.99 }]);
        let result = parse_annotate_response(&response_json("UNLIKELY", objects), 0.5).unwrap();
        assert_eq!(result.violence, Likelihood::Unlikely);
    }

    #[test]
    fn api_error_in_response_is_error() {
        let body = json!({ "responses": [{ "error": { "code": 3, "message": "Bad image data." } }] });
        let result = parse_annotate_response(body.to_string().as_bytes(), 0.5);
        assert!(result.is_err());
    }

    #[test]
    fn missing_safe_search_annotation_is_error() {
        let body = json!({ "responses": [{}] });
        assert!(parse_annotate_response(body.to_string().as_bytes(), 0.5).is_err());
        let body = json!({ "responses": [] });
        assert!(parse_annotate_response(body.to_string().as_bytes(), 0.5).is_err());
    }

    #[derive(Default)]
    struct FakeApiState {
        token_requests: AtomicUsize,
        annotate_requests: AtomicUsize,
    }

    async fn fake_token(State(state): State<Arc<FakeApiState>>, body: String) -> Json<serde_json::Value> {
        state.token_requests.fetch_add(1, Ordering::SeqCst);
        assert!(body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));
        assert!(body.contains("assertion="));
        Json(json!({ "access_token": "test-token", "expires_in": 3600, "token_type": "Bearer" }))
    }

    async fn fake_annotate(
        State(state): State<Arc<FakeApiState>>,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> std::result::Result<Json<serde_json::Value>, StatusCode> {
        state.annotate_requests.fetch_add(1, Ordering::SeqCst);
        let api_key_ok = query.as_deref() == Some("key=test-key");
        let bearer_ok = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-token");
        if !api_key_ok && !bearer_ok {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let request = &body["requests"][0];
        assert_eq!(request["image"]["content"], "aW1hZ2U=");
        assert_eq!(request["features"][0]["type"], FEATURE_SAFE_SEARCH_DETECTION);
        assert_eq!(request["features"][1]["type"], FEATURE_OBJECT_LOCALIZATION);
        let response: serde_json::Value = serde_json::from_slice(&response_json(
            "VERY_UNLIKELY",
            json!([{ "name": "Knife", "score": 0.7 }]),
        ))
        .unwrap();
        Ok(Json(response))
    }

    async fn start_fake_api() -> (Url, Arc<FakeApiState>) {
        let state = Arc::new(FakeApiState::default());
        let router = Router::new()
            .route("/token", post(fake_token))
            .route("/v1/images:annotate", post(fake_annotate))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (Url::parse(&format!("http://{addr}/")).unwrap(), state)
    }

    fn classifier(base: &Url, credentials: ClassifierCredentials) -> GoogleVisionClassifier {
        GoogleVisionClassifier::with_credentials(
            base.join("v1/images:annotate").unwrap(),
            &credentials,
            Duration::from_secs(5),
            0.5,
            reqwest::Client::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn api_key_request_is_classified() {
        let (base, state) = start_fake_api().await;
        let classifier = classifier(&base, ClassifierCredentials::ApiKey("test-key".to_string()));

        let result = classifier.classify(b"image").await.unwrap();

        assert_eq!(result.violence, Likelihood::VeryLikely);
        assert_eq!(result.racy, Likelihood::Possible);
        assert_eq!(state.annotate_requests.load(Ordering::SeqCst), 1);
        assert_eq!(state.token_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_api_key_is_classifier_error() {
        let (base, _) = start_fake_api().await;
        let classifier = classifier(&base, ClassifierCredentials::ApiKey("wrong".to_string()));

        let error = classifier.classify(b"image").await.unwrap_err();

        assert!(matches!(
            error.current_context(),
            ClassifierError::ClassifierUnavailable
        ));
    }

    #[tokio::test]
    async fn service_account_token_is_cached() {
        let (base, state) = start_fake_api().await;
        let json = json!({
            "client_email": "moderation@example.iam.gserviceaccount.com",
            "private_key": TEST_PRIVATE_KEY,
            "token_uri": base.join("token").unwrap().to_string(),
        })
        .to_string();
        let classifier = classifier(&base, ClassifierCredentials::ServiceAccountJson(json));

        classifier.classify(b"image").await.unwrap();
        classifier.classify(b"image").await.unwrap();

        assert_eq!(state.token_requests.load(Ordering::SeqCst), 1);
        assert_eq!(state.annotate_requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_api_is_classifier_error() {
        let classifier = GoogleVisionClassifier::with_credentials(
            Url::parse("http://127.0.0.1:1/v1/images:annotate").unwrap(),
            &ClassifierCredentials::ApiKey("test-key".to_string()),
            Duration::from_secs(5),
            0.5,
            reqwest::Client::new(),
        )
        .unwrap();

        assert!(classifier.classify(b"image").await.is_err());
    }
}
