//! Rowan language implementation for FSH
//!
//! Connects [`FshSyntaxKind`] to Rowan's generic CST infrastructure.

use rowan::Language;

use super::FshSyntaxKind;

/// Language implementation for FHIR Shorthand
///
/// A zero-sized type implementing `rowan::Language` to bridge our syntax
/// kinds and Rowan's generic tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FshLanguage;

impl Language for FshLanguage {
    type Kind = FshSyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        match raw.0 {
            // Trivia
            0 => FshSyntaxKind::Whitespace,
            1 => FshSyntaxKind::CommentLine,
            2 => FshSyntaxKind::CommentBlock,
            3 => FshSyntaxKind::Newline,

            // Keywords (10-69)
            10 => FshSyntaxKind::AliasKw,
            11 => FshSyntaxKind::ProfileKw,
            12 => FshSyntaxKind::ExtensionKw,
            13 => FshSyntaxKind::InstanceKw,
            14 => FshSyntaxKind::ValuesetKw,
            20 => FshSyntaxKind::ParentKw,
            21 => FshSyntaxKind::IdKw,
            22 => FshSyntaxKind::TitleKw,
            23 => FshSyntaxKind::DescriptionKw,
            24 => FshSyntaxKind::InstanceofKw,
            30 => FshSyntaxKind::FromKw,
            31 => FshSyntaxKind::OnlyKw,
            32 => FshSyntaxKind::ContainsKw,
            33 => FshSyntaxKind::AndKw,
            34 => FshSyntaxKind::OrKw,
            35 => FshSyntaxKind::NamedKw,
            36 => FshSyntaxKind::IncludeKw,
            37 => FshSyntaxKind::ExcludeKw,
            38 => FshSyntaxKind::CodesKw,
            39 => FshSyntaxKind::WhereKw,
            40 => FshSyntaxKind::SystemKw,
            41 => FshSyntaxKind::ValuesetRefKw,
            50 => FshSyntaxKind::RequiredKw,
            51 => FshSyntaxKind::ExtensibleKw,
            52 => FshSyntaxKind::PreferredKw,
            53 => FshSyntaxKind::ExampleKw,
            60 => FshSyntaxKind::True,
            61 => FshSyntaxKind::False,

            // Flags (70-79)
            70 => FshSyntaxKind::MsFlag,
            71 => FshSyntaxKind::SuFlag,
            72 => FshSyntaxKind::TuFlag,
            73 => FshSyntaxKind::NFlag,
            74 => FshSyntaxKind::DFlag,
            75 => FshSyntaxKind::ModifierFlag,

            // Punctuation (100-149)
            100 => FshSyntaxKind::Colon,
            101 => FshSyntaxKind::Equals,
            102 => FshSyntaxKind::Asterisk,
            103 => FshSyntaxKind::Comma,
            104 => FshSyntaxKind::LParen,
            105 => FshSyntaxKind::RParen,

            // Literals & Identifiers (150-199)
            150 => FshSyntaxKind::Ident,
            151 => FshSyntaxKind::String,
            152 => FshSyntaxKind::MultilineString,
            153 => FshSyntaxKind::Number,
            154 => FshSyntaxKind::DateTime,
            155 => FshSyntaxKind::Time,
            156 => FshSyntaxKind::Card,
            157 => FshSyntaxKind::Regex,
            158 => FshSyntaxKind::Unit,
            159 => FshSyntaxKind::Code,
            160 => FshSyntaxKind::ReferenceLit,
            161 => FshSyntaxKind::CaretSequence,
            162 => FshSyntaxKind::CommaDelimitedSequences,
            163 => FshSyntaxKind::CommaDelimitedCodes,

            // Structure nodes (200-399)
            200 => FshSyntaxKind::Document,
            210 => FshSyntaxKind::Alias,
            211 => FshSyntaxKind::Profile,
            212 => FshSyntaxKind::Extension,
            213 => FshSyntaxKind::Instance,
            214 => FshSyntaxKind::ValueSet,
            230 => FshSyntaxKind::ParentClause,
            231 => FshSyntaxKind::IdClause,
            232 => FshSyntaxKind::TitleClause,
            233 => FshSyntaxKind::DescriptionClause,
            234 => FshSyntaxKind::InstanceofClause,
            250 => FshSyntaxKind::CardRule,
            251 => FshSyntaxKind::FlagRule,
            252 => FshSyntaxKind::ValuesetRule,
            253 => FshSyntaxKind::FixedValueRule,
            254 => FshSyntaxKind::OnlyRule,
            255 => FshSyntaxKind::ContainsRule,
            256 => FshSyntaxKind::CaretValueRule,
            257 => FshSyntaxKind::PathRule,
            270 => FshSyntaxKind::Path,
            271 => FshSyntaxKind::ContainsItem,
            272 => FshSyntaxKind::Quantity,
            273 => FshSyntaxKind::Ratio,
            274 => FshSyntaxKind::RatioPart,
            300 => FshSyntaxKind::VsComponent,
            301 => FshSyntaxKind::VsConceptComponent,
            302 => FshSyntaxKind::VsFilterComponent,
            303 => FshSyntaxKind::VsComponentFrom,
            304 => FshSyntaxKind::VsFromSystem,
            305 => FshSyntaxKind::VsFromValueset,
            306 => FshSyntaxKind::VsFilterList,
            307 => FshSyntaxKind::VsFilterDefinition,
            308 => FshSyntaxKind::VsFilterOperator,
            309 => FshSyntaxKind::VsFilterValue,

            // Special tokens (400+)
            400 => FshSyntaxKind::Error,
            401 => FshSyntaxKind::Eof,
            402 => FshSyntaxKind::Unknown,

            // Tombstone
            999 => FshSyntaxKind::Tombstone,

            _ => FshSyntaxKind::Unknown,
        }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        let kinds = [
            FshSyntaxKind::Whitespace,
            FshSyntaxKind::ProfileKw,
            FshSyntaxKind::Ident,
            FshSyntaxKind::Colon,
            FshSyntaxKind::Card,
            FshSyntaxKind::Profile,
            FshSyntaxKind::CardRule,
            FshSyntaxKind::VsFilterDefinition,
        ];

        for &kind in &kinds {
            let raw = FshLanguage::kind_to_raw(kind);
            let back = FshLanguage::kind_from_raw(raw);
            assert_eq!(kind, back, "Roundtrip failed for {kind:?}");
        }
    }

    #[test]
    fn test_kind_values() {
        assert_eq!(FshLanguage::kind_to_raw(FshSyntaxKind::Whitespace).0, 0);
        assert_eq!(FshLanguage::kind_to_raw(FshSyntaxKind::AliasKw).0, 10);
        assert_eq!(FshLanguage::kind_to_raw(FshSyntaxKind::Colon).0, 100);
        assert_eq!(FshLanguage::kind_to_raw(FshSyntaxKind::Document).0, 200);
    }
}
