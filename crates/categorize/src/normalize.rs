/// Canonical form used for all keyword matching.
///
/// Punctuation becomes a space, whitespace runs collapse to one space and the
/// result is trimmed and lowercased. Accents are kept.
pub fn normalize_description(description: &str) -> String {
    let spaced: String = description
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_dates() {
        assert_eq!(
            normalize_description("PIX QRS IFOOD COM A18/06"),
            "pix qrs ifood com a18 06"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_description("  PAY \t UBER\n14/06  "), "pay uber 14 06");
    }

    #[test]
    fn keeps_accents() {
        assert_eq!(
            normalize_description("Reserva por gastos Férias"),
            "reserva por gastos férias"
        );
        assert_eq!(normalize_description("FARMÁCIA São João"), "farmácia são joão");
    }

    #[test]
    fn splits_hyphenated_codes() {
        assert_eq!(normalize_description("INT IPVA-SP FGQ-1370"), "int ipva sp fgq 1370");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(normalize_description("*** /// ---"), "");
        assert_eq!(normalize_description(""), "");
    }
}
