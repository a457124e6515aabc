use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::Error;
use crate::models::poll::PollType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

// Shape is dictated by the poll's type; the variants carry the three wire
// shapes {answer}, {selectedOption} and {ranking}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choices {
    YesNo {
        answer: Answer,
    },
    MultipleChoice {
        #[serde(rename = "selectedOption")]
        selected_option: String,
    },
    RankedChoice {
        ranking: Vec<String>,
    },
}

impl Choices {
    pub fn validate(&self, poll_type: PollType, options: &[String]) -> Result<(), Error> {
        match (poll_type, self) {
            (PollType::YesNo, Choices::YesNo { .. }) => Ok(()),
            (PollType::MultipleChoice, Choices::MultipleChoice { selected_option }) => {
                if !options.iter().any(|o| o == selected_option) {
                    return Err(Error::Validation(format!(
                        "{} is not an option of this poll",
                        selected_option
                    )));
                }
                Ok(())
            }
            (PollType::RankedChoice, Choices::RankedChoice { ranking }) => {
                if ranking.is_empty() {
                    return Err(Error::Validation("ranking must not be empty".into()));
                }
                for (i, name) in ranking.iter().enumerate() {
                    if !options.iter().any(|o| o == name) {
                        return Err(Error::Validation(format!("{} is not an option of this poll", name)));
                    }
                    if ranking[..i].contains(name) {
                        return Err(Error::Validation(format!("{} is ranked more than once", name)));
                    }
                }
                Ok(())
            }
            _ => Err(Error::Validation("choices do not match the poll type".into())),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ballot {
    pub id: i64,
    pub poll_id: String,
    pub voter_id: String,
    pub choices: Json<Choices>,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Red".to_owned(), "Blue".to_owned(), "Green".to_owned()]
    }

    #[test]
    fn test_yes_no_shape() {
        let choices = Choices::YesNo { answer: Answer::Yes };
        assert!(choices.validate(PollType::YesNo, &[]).is_ok());
        assert!(choices.validate(PollType::MultipleChoice, &options()).is_err());
    }

    #[test]
    fn test_multiple_choice_shape() {
        let choices = Choices::MultipleChoice {
            selected_option: "Blue".into(),
        };
        assert!(choices.validate(PollType::MultipleChoice, &options()).is_ok());

        let unknown = Choices::MultipleChoice {
            selected_option: "Yellow".into(),
        };
        assert!(unknown.validate(PollType::MultipleChoice, &options()).is_err());
        assert!(choices.validate(PollType::YesNo, &[]).is_err());
    }

    #[test]
    fn test_ranked_choice_shape() {
        let choices = Choices::RankedChoice {
            ranking: vec!["Green".into(), "Red".into()],
        };
        assert!(choices.validate(PollType::RankedChoice, &options()).is_ok());

        let empty = Choices::RankedChoice { ranking: vec![] };
        assert!(empty.validate(PollType::RankedChoice, &options()).is_err());

        let unknown = Choices::RankedChoice {
            ranking: vec!["Yellow".into()],
        };
        assert!(unknown.validate(PollType::RankedChoice, &options()).is_err());

        let duplicated = Choices::RankedChoice {
            ranking: vec!["Red".into(), "Blue".into(), "Red".into()],
        };
        assert!(duplicated.validate(PollType::RankedChoice, &options()).is_err());
    }

    #[test]
    fn test_wire_shapes() {
        let yes: Choices = serde_json::from_str(r#"{"answer":"yes"}"#).unwrap();
        assert_eq!(yes, Choices::YesNo { answer: Answer::Yes });

        let selected: Choices = serde_json::from_str(r#"{"selectedOption":"Red"}"#).unwrap();
        assert_eq!(
            selected,
            Choices::MultipleChoice {
                selected_option: "Red".into()
            }
        );

        let ranked: Choices = serde_json::from_str(r#"{"ranking":["Red","Blue"]}"#).unwrap();
        assert_eq!(
            ranked,
            Choices::RankedChoice {
                ranking: vec!["Red".into(), "Blue".into()]
            }
        );

        assert!(serde_json::from_str::<Choices>(r#"{"answer":"maybe"}"#).is_err());
    }
}
