use serde::Serialize;

/// Which stage finally produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Database,
    Tmdb,
    Google,
    None,
}

/// Progress and terminal events pushed over the chat stream. The tag and
/// field names are part of the wire contract with the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    DbSearch {
        message: String,
    },
    DbNotFound {
        message: String,
    },
    TmdbFound {
        message: String,
    },
    GoogleFound {
        message: String,
    },
    Final {
        message: String,
        #[serde(rename = "searchedDb")]
        searched_db: bool,
        #[serde(rename = "searchedTmdb")]
        searched_tmdb: bool,
        #[serde(rename = "searchedGoogle")]
        searched_google: bool,
        source: AnswerSource,
    },
    Error {
        message: String,
    },
}

impl ChatEvent {
    pub fn db_search() -> Self {
        Self::DbSearch {
            // The frontend keys on the type tag; these two payloads repeat
            // the stage name rather than carrying display text.
            message: "db_searching".to_owned(),
        }
    }

    pub fn db_not_found() -> Self {
        Self::DbNotFound {
            message: "db_not_found".to_owned(),
        }
    }

    pub fn tmdb_found() -> Self {
        Self::TmdbFound {
            message: "✅ Tìm thấy trên Internet, đang tổng hợp...".to_owned(),
        }
    }

    pub fn google_found() -> Self {
        Self::GoogleFound {
            message: "Tìm thấy trên Internet, đang tổng hợp...".to_owned(),
        }
    }

    pub fn final_answer(
        message: String,
        searched_tmdb: bool,
        searched_google: bool,
        source: AnswerSource,
    ) -> Self {
        Self::Final {
            message,
            // The local database is always consulted first.
            searched_db: true,
            searched_tmdb,
            searched_google,
            source,
        }
    }

    pub fn server_error() -> Self {
        Self::Error {
            message: "Lỗi máy chủ".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn final_event_uses_the_frontend_field_names() {
        let event = ChatEvent::final_answer("xong".to_owned(), true, false, AnswerSource::Tmdb);
        let value = serde_json::to_value(&event).expect("serialization failed");
        assert_eq!(
            value,
            json!({
                "type": "final",
                "message": "xong",
                "searchedDb": true,
                "searchedTmdb": true,
                "searchedGoogle": false,
                "source": "tmdb",
            })
        );
    }

    #[test]
    fn progress_events_are_snake_case_tagged() {
        let value = serde_json::to_value(ChatEvent::db_not_found()).expect("serialization failed");
        assert_eq!(value["type"], "db_not_found");
        assert_eq!(value["message"], "db_not_found");
        let value = serde_json::to_value(ChatEvent::db_search()).expect("serialization failed");
        assert_eq!(value["type"], "db_search");
        assert_eq!(value["message"], "db_searching");
    }

    #[test]
    fn missing_source_serializes_as_none() {
        let event =
            ChatEvent::final_answer("Xin lỗi".to_owned(), true, true, AnswerSource::None);
        let value = serde_json::to_value(&event).expect("serialization failed");
        assert_eq!(value["source"], "none");
    }
}
