//! Authentication route handlers.
//!
//! Password sign-up/sign-in, token refresh and phone OTP sign-in. All of
//! these sit behind the strict auth rate limiter.

use axum::{Json, extract::State};
use tracing::instrument;

use dream_collections_core::api::{
    JwtResponse, LoginRequest, MessageResponse, OtpResendRequest, OtpResponse, OtpSendRequest,
    OtpVerifyRequest, RefreshRequest, SignupRequest,
};

use crate::error::Result;
use crate::services::auth::AuthService;
use crate::services::otp::OtpService;
use crate::state::AppState;

/// `POST /api/auth/signup`
#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.tokens())
        .signup(&req)
        .await?;
    Ok(Json(MessageResponse::ok("User registered successfully!")))
}

/// `POST /api/auth/signin`
#[instrument(skip(state, req))]
pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<JwtResponse>> {
    let response = AuthService::new(state.pool(), state.tokens())
        .signin(&req)
        .await?;
    tracing::info!(user_id = %response.id, "Signed in");
    Ok(Json(response))
}

/// `POST /api/auth/refresh`
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<JwtResponse>> {
    let response = AuthService::new(state.pool(), state.tokens())
        .refresh(&req.refresh_token)
        .await?;
    Ok(Json(response))
}

/// `POST /api/auth/otp/send`
#[instrument(skip_all)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpSendRequest>,
) -> Result<Json<OtpResponse>> {
    let response = OtpService::new(state.pool(), state.tokens(), state.otp_sender())
        .send(&req)
        .await?;
    Ok(Json(response))
}

/// `POST /api/auth/otp/verify`
#[instrument(skip_all)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpVerifyRequest>,
) -> Result<Json<JwtResponse>> {
    let response = OtpService::new(state.pool(), state.tokens(), state.otp_sender())
        .verify(&req)
        .await?;
    tracing::info!(user_id = %response.id, "Signed in with OTP");
    Ok(Json(response))
}

/// `POST /api/auth/otp/resend`
#[instrument(skip_all)]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpResendRequest>,
) -> Result<Json<OtpResponse>> {
    let response = OtpService::new(state.pool(), state.tokens(), state.otp_sender())
        .resend(&req.phone_number, req.email.as_deref())
        .await?;
    Ok(Json(response))
}
