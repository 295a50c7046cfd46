/// Maximum length accepted for a ticket title.
pub const TITLE_MAX_LEN: usize = 255;

/// Validation errors for ticket data
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validates the descriptive fields of a new ticket
pub fn validate_ticket_data(title: &str, description: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push(ValidationError::new("title", "Ticket title is required"));
    }

    if title.chars().count() > TITLE_MAX_LEN {
        errors.push(ValidationError::new(
            "title",
            format!("Ticket title exceeds {} characters", TITLE_MAX_LEN),
        ));
    }

    if description.trim().is_empty() {
        errors.push(ValidationError::new(
            "description",
            "Ticket description is required",
        ));
    }

    errors
}

/// Truncates a string to a maximum length with ellipsis
pub fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_length.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ticket_data() {
        let errors = validate_ticket_data("Imprimante en panne", "Plus de toner au 2e étage");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_empty_title_and_description() {
        let errors = validate_ticket_data("  ", "");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "title");
        assert_eq!(errors[1].field, "description");
    }

    #[test]
    fn test_title_too_long() {
        let long_title = "x".repeat(TITLE_MAX_LEN + 1);
        let errors = validate_ticket_data(&long_title, "desc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-ten", 11), "exactly-ten");
        let cut = truncate("much longer than allowed", 8);
        assert_eq!(cut.chars().count(), 8);
        assert!(cut.ends_with('…'));
    }
}
