//! One-shot notices carried across redirects as `?success=` / `?error=` codes.

use serde::Deserialize;

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// A message banner shown at the top of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub is_error: bool,
    pub message: &'static str,
}

impl Notice {
    /// Message for the first known code in the query, errors first.
    /// Unknown codes are ignored.
    #[must_use]
    pub fn from_query(query: &MessageQuery) -> Option<Self> {
        let error = query.error.as_deref().and_then(error_message).map(|message| Self {
            is_error: true,
            message,
        });

        error.or_else(|| {
            query
                .success
                .as_deref()
                .and_then(success_message)
                .map(|message| Self {
                    is_error: false,
                    message,
                })
        })
    }
}

fn success_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "created" => "温泉情報を登録しました！🎉",
        "updated" => "温泉情報を更新しました！✨",
        "deleted" => "温泉情報が削除されました！🔥",
        "review_created" => "レビューが投稿されました！🎉",
        "review_deleted" => "レビューが削除されました！🔥",
        _ => return None,
    };
    Some(message)
}

fn error_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "login_required" => "ログインが必要なルートです！🚧",
        "credentials" => {
            "ログインに失敗しました。アカウント名とパスワードを再度ご確認ください。"
        }
        "not_author" => "あなたにこの温泉情報を編集できません！🚧",
        "not_reviewer" => "あなたはこのレビューを削除できません！🚧",
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(error: Option<&str>, success: Option<&str>) -> MessageQuery {
        MessageQuery {
            error: error.map(str::to_owned),
            success: success.map(str::to_owned),
        }
    }

    #[test]
    fn test_known_codes() {
        let notice = Notice::from_query(&query(None, Some("deleted"))).unwrap();
        assert!(!notice.is_error);
        assert_eq!(notice.message, "温泉情報が削除されました！🔥");

        let notice = Notice::from_query(&query(Some("credentials"), None)).unwrap();
        assert!(notice.is_error);
        assert!(notice.message.starts_with("ログインに失敗しました。"));
    }

    #[test]
    fn test_error_wins_over_success() {
        let notice = Notice::from_query(&query(Some("not_author"), Some("updated"))).unwrap();
        assert!(notice.is_error);
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        assert!(Notice::from_query(&query(Some("<script>"), None)).is_none());
        assert!(Notice::from_query(&MessageQuery::default()).is_none());
    }
}
