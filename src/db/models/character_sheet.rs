//! Character sheet model and DTOs.
//!
//! Nested groups (attributes, abilities, spheres, advantages, health) are
//! stored as JSON columns and replaced wholesale when an update provides the
//! corresponding top-level key.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, FromRow)]
pub struct CharacterSheetRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub player: String,
    pub chronicle: String,
    pub nature: String,
    pub demeanor: String,
    pub concept: String,
    /// JSON `Attributes` object
    pub attributes: String,
    /// JSON `Abilities` object
    pub abilities: String,
    /// JSON `Spheres` object
    pub spheres: String,
    /// JSON `Advantages` object
    pub advantages: String,
    /// JSON `HealthTrack` object
    pub health: String,
    pub experience: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Attributes {
    pub physical: PhysicalAttributes,
    pub social: SocialAttributes,
    pub mental: MentalAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicalAttributes {
    pub strength: u8,
    pub dexterity: u8,
    pub stamina: u8,
}

impl Default for PhysicalAttributes {
    fn default() -> Self {
        Self {
            strength: 1,
            dexterity: 1,
            stamina: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocialAttributes {
    pub charisma: u8,
    pub manipulation: u8,
    pub appearance: u8,
}

impl Default for SocialAttributes {
    fn default() -> Self {
        Self {
            charisma: 1,
            manipulation: 1,
            appearance: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MentalAttributes {
    pub perception: u8,
    pub intelligence: u8,
    pub wits: u8,
}

impl Default for MentalAttributes {
    fn default() -> Self {
        Self {
            perception: 1,
            intelligence: 1,
            wits: 1,
        }
    }
}

/// Ability ratings keyed by ability name, grouped the way the sheet is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Abilities {
    pub talents: BTreeMap<String, u8>,
    pub skills: BTreeMap<String, u8>,
    pub knowledges: BTreeMap<String, u8>,
}

/// The nine sphere tracks, rated 0..=5.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Spheres {
    pub correspondence: u8,
    pub entropy: u8,
    pub forces: u8,
    pub life: u8,
    pub matter: u8,
    pub mind: u8,
    pub prime: u8,
    pub spirit: u8,
    pub time: u8,
}

impl Spheres {
    pub fn ratings(&self) -> [u8; 9] {
        [
            self.correspondence,
            self.entropy,
            self.forces,
            self.life,
            self.matter,
            self.mind,
            self.prime,
            self.spirit,
            self.time,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedRating {
    pub name: String,
    pub value: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Advantages {
    pub backgrounds: Vec<NamedRating>,
    pub merits: Vec<NamedRating>,
    pub flaws: Vec<NamedRating>,
    pub arete: u8,
    pub willpower: u8,
    pub willpower_current: u8,
    pub quintessence: u8,
    pub paradox: u8,
}

impl Default for Advantages {
    fn default() -> Self {
        Self {
            backgrounds: Vec::new(),
            merits: Vec::new(),
            flaws: Vec::new(),
            arete: 1,
            willpower: 1,
            willpower_current: 1,
            quintessence: 0,
            paradox: 0,
        }
    }
}

/// The seven damage levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthTrack {
    pub bruised: bool,
    pub hurt: bool,
    pub injured: bool,
    pub wounded: bool,
    pub mauled: bool,
    pub crippled: bool,
    pub incapacitated: bool,
}

/// Response DTO with the JSON columns parsed back into typed groups.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterSheetResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub player: String,
    pub chronicle: String,
    pub nature: String,
    pub demeanor: String,
    pub concept: String,
    pub attributes: Attributes,
    pub abilities: Abilities,
    pub spheres: Spheres,
    pub advantages: Advantages,
    pub health: HealthTrack,
    pub experience: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn parse_column<T: Default + for<'de> Deserialize<'de>>(json: &str) -> T {
    serde_json::from_str(json).unwrap_or_default()
}

impl From<CharacterSheetRow> for CharacterSheetResponse {
    fn from(row: CharacterSheetRow) -> Self {
        Self {
            attributes: parse_column(&row.attributes),
            abilities: parse_column(&row.abilities),
            spheres: parse_column(&row.spheres),
            advantages: parse_column(&row.advantages),
            health: parse_column(&row.health),
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            player: row.player,
            chronicle: row.chronicle,
            nature: row.nature,
            demeanor: row.demeanor,
            concept: row.concept,
            experience: row.experience,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Sheet joined with its owner's username, for the narrator's overview.
#[derive(Debug, Clone, FromRow)]
pub struct CharacterSheetWithUserRow {
    #[sqlx(flatten)]
    pub sheet: CharacterSheetRow,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterSheetWithUser {
    pub username: String,
    pub sheet: CharacterSheetResponse,
}

impl From<CharacterSheetWithUserRow> for CharacterSheetWithUser {
    fn from(row: CharacterSheetWithUserRow) -> Self {
        Self {
            username: row.username,
            sheet: row.sheet.into(),
        }
    }
}

/// Shallow-merge update: a provided top-level key replaces the stored value
/// wholesale; absent keys leave the stored value untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCharacterSheetRequest {
    pub name: Option<String>,
    pub player: Option<String>,
    pub chronicle: Option<String>,
    pub nature: Option<String>,
    pub demeanor: Option<String>,
    pub concept: Option<String>,
    pub attributes: Option<Attributes>,
    pub abilities: Option<Abilities>,
    pub spheres: Option<Spheres>,
    pub advantages: Option<Advantages>,
    pub health: Option<HealthTrack>,
    pub experience: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_defaults_are_one() {
        let attrs = Attributes::default();
        assert_eq!(attrs.physical.strength, 1);
        assert_eq!(attrs.social.appearance, 1);
        assert_eq!(attrs.mental.wits, 1);
    }

    #[test]
    fn test_advantage_defaults() {
        let adv = Advantages::default();
        assert_eq!(adv.arete, 1);
        assert_eq!(adv.willpower, 1);
        assert_eq!(adv.quintessence, 0);
        assert!(adv.backgrounds.is_empty());
    }

    #[test]
    fn test_partial_nested_json_fills_defaults() {
        // A nested group arriving with only some members still deserializes;
        // the rest take their defaults. This is the "replaced wholesale"
        // semantics of the shallow merge.
        let attrs: Attributes =
            serde_json::from_str(r#"{"physical": {"strength": 4}}"#).unwrap();
        assert_eq!(attrs.physical.strength, 4);
        assert_eq!(attrs.physical.dexterity, 1);
        assert_eq!(attrs.social, SocialAttributes::default());
    }

    #[test]
    fn test_corrupt_column_parses_as_default() {
        assert_eq!(parse_column::<Spheres>("not json"), Spheres::default());
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let err = serde_json::from_str::<UpdateCharacterSheetRequest>(
            r#"{"name": "Circe", "hitpoints": 40}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_sphere_ratings_order() {
        let spheres = Spheres {
            correspondence: 1,
            time: 5,
            ..Spheres::default()
        };
        let ratings = spheres.ratings();
        assert_eq!(ratings[0], 1);
        assert_eq!(ratings[8], 5);
    }
}
