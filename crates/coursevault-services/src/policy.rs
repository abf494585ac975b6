//! Access policy evaluation
//!
//! Pure decision function for one (file, principal, action) triple. Checks
//! run in a fixed order and short-circuit on the first denial; the caller
//! supplies every piece of state (grant row, entitlement answer, clock) so
//! the function itself touches nothing.

use chrono::{DateTime, Utc};
use coursevault_core::models::{AccessAction, AccessGrant, Role, StoredFile};
use coursevault_core::DenyReason;

/// Decide whether `role` may perform `action` on `file`.
///
/// Evaluation order:
/// 1. liveness (active, not past hard expiry)
/// 2. access tier
/// 3. per-file capability flags (download/stream)
/// 4. explicit grant: expiry, then download quota; an absent grant falls
///    back to the tier result
/// 5. content association, deferred to the entitlement collaborator's
///    answer when the file is linked to course content
///
/// `Err` is a denial, not a fault: the caller still audit-logs it.
pub fn evaluate(
    file: &StoredFile,
    role: Role,
    action: AccessAction,
    grant: Option<&AccessGrant>,
    content_allowed: Option<bool>,
    now: DateTime<Utc>,
) -> Result<(), DenyReason> {
    if !file.is_available(now) {
        return Err(DenyReason::FileUnavailable);
    }

    if !role.satisfies(file.access_level) {
        return Err(DenyReason::InsufficientTier);
    }

    if action == AccessAction::Download && !file.allow_download {
        return Err(DenyReason::DownloadDisabled);
    }
    if action == AccessAction::Stream && !file.allow_streaming {
        return Err(DenyReason::StreamDisabled);
    }

    if let Some(grant) = grant {
        if grant.is_expired(now) {
            return Err(DenyReason::GrantExpired);
        }
        if action == AccessAction::Download {
            if let Some(quota) = file.max_downloads {
                if grant.access_count >= quota {
                    return Err(DenyReason::QuotaExceeded);
                }
            }
        }
    }

    if file.has_content_association() && content_allowed == Some(false) {
        return Err(DenyReason::ContentRestricted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use coursevault_core::models::AccessLevel;
    use coursevault_core::models::FileType;
    use uuid::Uuid;

    fn file_with_level(level: AccessLevel) -> StoredFile {
        let now = Utc::now();
        StoredFile {
            id: Uuid::new_v4(),
            name: "lecture.mp4".to_string(),
            original_name: "lecture.mp4".to_string(),
            storage_path: "protected/videos/abc.mp4".to_string(),
            file_type: FileType::Video,
            file_size: 1024,
            mime_type: "video/mp4".to_string(),
            access_level: level,
            course_id: None,
            chapter_id: None,
            lesson_id: None,
            is_encrypted: false,
            encryption_key: None,
            checksum: None,
            uploaded_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            is_active: true,
            allow_download: true,
            allow_streaming: true,
            max_downloads: None,
            expires_at: None,
        }
    }

    fn grant_for(file: &StoredFile, count: i32) -> AccessGrant {
        let now = Utc::now();
        AccessGrant {
            id: Uuid::new_v4(),
            file_id: file.id,
            user_id: Uuid::new_v4(),
            access_type: AccessAction::Download,
            granted_at: now,
            expires_at: None,
            granted_by: Uuid::new_v4(),
            access_count: count,
            last_accessed: None,
        }
    }

    #[test]
    fn tier_allows_equal_or_greater_privilege() {
        let now = Utc::now();
        let file = file_with_level(AccessLevel::Professor);
        assert!(evaluate(&file, Role::Professor, AccessAction::Stream, None, None, now).is_ok());
        assert!(evaluate(&file, Role::Admin, AccessAction::Stream, None, None, now).is_ok());
        assert_eq!(
            evaluate(&file, Role::Student, AccessAction::Stream, None, None, now),
            Err(DenyReason::InsufficientTier)
        );
    }

    #[test]
    fn public_tier_allows_anonymous() {
        let now = Utc::now();
        let file = file_with_level(AccessLevel::Public);
        assert!(evaluate(&file, Role::Anonymous, AccessAction::Stream, None, None, now).is_ok());
    }

    #[test]
    fn admin_tier_denies_everyone_but_admin() {
        let now = Utc::now();
        let file = file_with_level(AccessLevel::Admin);
        assert_eq!(
            evaluate(&file, Role::Anonymous, AccessAction::Stream, None, None, now),
            Err(DenyReason::InsufficientTier)
        );
        assert_eq!(
            evaluate(&file, Role::Professor, AccessAction::Stream, None, None, now),
            Err(DenyReason::InsufficientTier)
        );
        assert!(evaluate(&file, Role::Admin, AccessAction::Stream, None, None, now).is_ok());
    }

    #[test]
    fn inactive_or_expired_file_is_unavailable() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Public);
        file.is_active = false;
        assert_eq!(
            evaluate(&file, Role::Admin, AccessAction::Stream, None, None, now),
            Err(DenyReason::FileUnavailable)
        );

        let mut file = file_with_level(AccessLevel::Public);
        file.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(
            evaluate(&file, Role::Admin, AccessAction::Stream, None, None, now),
            Err(DenyReason::FileUnavailable)
        );
    }

    #[test]
    fn capability_flags_gate_download_and_stream() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Student);
        file.allow_download = false;
        assert_eq!(
            evaluate(&file, Role::Student, AccessAction::Download, None, None, now),
            Err(DenyReason::DownloadDisabled)
        );
        // streaming still allowed
        assert!(evaluate(&file, Role::Student, AccessAction::Stream, None, None, now).is_ok());

        let mut file = file_with_level(AccessLevel::Student);
        file.allow_streaming = false;
        assert_eq!(
            evaluate(&file, Role::Student, AccessAction::Stream, None, None, now),
            Err(DenyReason::StreamDisabled)
        );
    }

    #[test]
    fn expired_grant_is_denied() {
        let now = Utc::now();
        let file = file_with_level(AccessLevel::Student);
        let mut grant = grant_for(&file, 0);
        grant.expires_at = Some(now - Duration::minutes(1));
        assert_eq!(
            evaluate(
                &file,
                Role::Student,
                AccessAction::Download,
                Some(&grant),
                None,
                now
            ),
            Err(DenyReason::GrantExpired)
        );
    }

    #[test]
    fn download_quota_is_enforced_at_the_boundary() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Student);
        file.max_downloads = Some(3);

        let grant = grant_for(&file, 2);
        assert!(evaluate(
            &file,
            Role::Student,
            AccessAction::Download,
            Some(&grant),
            None,
            now
        )
        .is_ok());

        let grant = grant_for(&file, 3);
        assert_eq!(
            evaluate(
                &file,
                Role::Student,
                AccessAction::Download,
                Some(&grant),
                None,
                now
            ),
            Err(DenyReason::QuotaExceeded)
        );
    }

    #[test]
    fn quota_does_not_apply_to_streaming() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Student);
        file.max_downloads = Some(1);
        let mut grant = grant_for(&file, 5);
        grant.access_type = AccessAction::Stream;
        assert!(evaluate(
            &file,
            Role::Student,
            AccessAction::Stream,
            Some(&grant),
            None,
            now
        )
        .is_ok());
    }

    #[test]
    fn absent_grant_falls_back_to_tier() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Student);
        file.max_downloads = Some(3);
        // No grant yet: first download allowed on tier alone
        assert!(evaluate(&file, Role::Student, AccessAction::Download, None, None, now).is_ok());
    }

    #[test]
    fn content_association_defers_to_collaborator() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Student);
        file.course_id = Some(Uuid::new_v4());

        // No answer supplied: pass through
        assert!(evaluate(&file, Role::Student, AccessAction::Stream, None, None, now).is_ok());
        assert!(evaluate(
            &file,
            Role::Student,
            AccessAction::Stream,
            None,
            Some(true),
            now
        )
        .is_ok());
        assert_eq!(
            evaluate(
                &file,
                Role::Student,
                AccessAction::Stream,
                None,
                Some(false),
                now
            ),
            Err(DenyReason::ContentRestricted)
        );

        // A negative answer is irrelevant without an association
        let file = file_with_level(AccessLevel::Student);
        assert!(evaluate(
            &file,
            Role::Student,
            AccessAction::Stream,
            None,
            Some(false),
            now
        )
        .is_ok());
    }

    #[test]
    fn denial_order_liveness_before_tier() {
        let now = Utc::now();
        let mut file = file_with_level(AccessLevel::Admin);
        file.is_active = false;
        // Liveness fires first even though the tier would also deny
        assert_eq!(
            evaluate(&file, Role::Student, AccessAction::Stream, None, None, now),
            Err(DenyReason::FileUnavailable)
        );
    }
}
