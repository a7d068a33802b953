//! Review invariants.

use super::error::DomainError;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

pub fn validate_rating(rating: i16) -> Result<i16, DomainError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(DomainError::out_of_range("rating", rating, "an integer from 1 to 5"))
    }
}

pub fn normalize_comment(comment: &str) -> Result<String, DomainError> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(DomainError::blank("comment"));
    }
    Ok(trimmed.to_string())
}

/// Authors may not review listings they own.
pub fn is_self_review(reviewer_id: &str, listing_author_id: &str) -> bool {
    reviewer_id == listing_author_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert_eq!(validate_rating(1).unwrap(), 1);
        assert_eq!(validate_rating(5).unwrap(), 5);
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn blank_comment_is_rejected() {
        assert!(normalize_comment("   ").is_err());
        assert_eq!(normalize_comment("  cosy flat ").unwrap(), "cosy flat");
    }

    #[test]
    fn detects_self_review() {
        assert!(is_self_review("user_1", "user_1"));
        assert!(!is_self_review("user_1", "user_2"));
    }
}
