use std::fmt;

use anyhow::{Context, Result, bail};
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::Client as StsClient;
use aws_smithy_types::{DateTime, date_time::Format};
use log::info;

use crate::dotenv::Replacements;

pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Temporary credentials returned by `GetSessionToken`.
#[derive(Clone)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl SessionCredentials {
    /// The `.env` keys these credentials are allowed to overwrite.
    pub fn replacements(&self) -> Replacements {
        [
            (ACCESS_KEY_ID, &self.access_key_id),
            (SECRET_ACCESS_KEY, &self.secret_access_key),
            (SESSION_TOKEN, &self.session_token),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }

    /// Expiry as an ISO 8601 timestamp, for display.
    pub fn expires_at(&self) -> String {
        self.expiration
            .fmt(Format::DateTime)
            .unwrap_or_else(|_| self.expiration.secs().to_string())
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// Fetches MFA-backed session credentials for the IAM user behind `profile`.
///
/// This function performs the three AWS calls the refresh needs:
/// 1. `sts:GetCallerIdentity` to learn the caller's ARN, and from it the user name
/// 2. `iam:ListMFADevices` to find the serial number of the user's first MFA device
/// 3. `sts:GetSessionToken` to exchange the MFA code for temporary credentials
///
/// # Arguments
///
/// * `profile` - Named profile from the shared AWS config/credentials files whose
///   long-term credentials sign the requests
/// * `token` - The current six-digit code from the MFA device
/// * `duration_secs` - Requested lifetime of the session credentials, in seconds
///
/// # Returns
///
/// * `Ok(SessionCredentials)` - Access key, secret key, session token and expiry
///
/// # Errors
///
/// This function will return an error if:
/// * Any of the three requests fails (network, expired or invalid MFA code,
///   missing `iam:ListMFADevices` permission, unknown profile)
/// * The caller is not an IAM user (root or assumed-role ARN)
/// * The user has no MFA device registered
/// * STS returns no credentials
pub async fn fetch_session_credentials(
    profile: &str,
    token: &str,
    duration_secs: u32,
) -> Result<SessionCredentials> {
    let config = aws_config::from_env().profile_name(profile).load().await;
    let sts = StsClient::new(&config);
    let iam = IamClient::new(&config);

    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .context("GetCallerIdentity failed")?;
    let arn = identity.arn().context("No ARN returned for caller")?;
    let user_name = user_name_from_arn(arn)?;

    let devices = iam
        .list_mfa_devices()
        .user_name(user_name)
        .send()
        .await
        .with_context(|| format!("ListMFADevices failed for {user_name}"))?;
    let serial_number = devices
        .mfa_devices()
        .first()
        .map(|device| device.serial_number().to_string())
        .with_context(|| format!("No MFA device registered for {user_name}"))?;

    info!("Fetching credentials - Profile: {profile}, Device: {serial_number}, Duration: {duration_secs}s");
    let session = sts
        .get_session_token()
        .duration_seconds(duration_secs as i32)
        .serial_number(&serial_number)
        .token_code(token)
        .send()
        .await
        .context("GetSessionToken failed")?
        .credentials()
        .cloned()
        .context("No credentials returned")?;

    Ok(SessionCredentials {
        access_key_id: session.access_key_id().to_string(),
        secret_access_key: session.secret_access_key().to_string(),
        session_token: session.session_token().to_string(),
        expiration: *session.expiration(),
    })
}

/// Extracts the user name from an IAM user ARN.
///
/// `arn:aws:iam::123456789012:user/ops/alice` yields `alice`. Root and
/// assumed-role ARNs carry no user name and are rejected.
pub fn user_name_from_arn(arn: &str) -> Result<&str> {
    let fields: Vec<&str> = arn.splitn(6, ':').collect();
    let ["arn", _partition, "iam", _region, _account, resource] = fields[..] else {
        bail!("Not an IAM ARN: {arn}");
    };

    match resource.strip_prefix("user/").and_then(|path| path.rsplit('/').next()) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => bail!("Caller is not an IAM user: {arn}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_name_from_plain_user_arn() {
        let name = user_name_from_arn("arn:aws:iam::123456789012:user/alice").unwrap();
        assert_eq!(name, "alice");
    }

    #[test]
    fn user_name_drops_iam_path() {
        let name = user_name_from_arn("arn:aws:iam::123456789012:user/division/ops/bob").unwrap();
        assert_eq!(name, "bob");
    }

    #[test]
    fn user_name_accepts_other_partitions() {
        let name = user_name_from_arn("arn:aws-us-gov:iam::123456789012:user/carol").unwrap();
        assert_eq!(name, "carol");
    }

    #[test]
    fn non_user_arns_are_rejected() {
        for arn in [
            "arn:aws:iam::123456789012:root",
            "arn:aws:sts::123456789012:assumed-role/Admin/session",
            "arn:aws:iam::123456789012:user/",
            "not-an-arn",
        ] {
            assert!(user_name_from_arn(arn).is_err(), "{arn} should be rejected");
        }
    }

    #[test]
    fn replacements_cover_exactly_the_three_aws_keys() {
        let creds = SessionCredentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
            expiration: DateTime::from_secs(1_700_000_000),
        };
        let map = creds.replacements();
        assert_eq!(map.len(), 3);
        assert_eq!(map[ACCESS_KEY_ID], "ASIAEXAMPLE");
        assert_eq!(map[SECRET_ACCESS_KEY], "secret");
        assert_eq!(map[SESSION_TOKEN], "token");
        assert_eq!(creds.expires_at(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = SessionCredentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "super-secret".into(),
            session_token: "session-token".into(),
            expiration: DateTime::from_secs(0),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("session-token"));
    }
}
