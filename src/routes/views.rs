use chrono::{NaiveDateTime, Utc};

use crate::content::reactions::ReactionLedger;
use crate::db::models::{Comment, Polarity, Post, Target};
use crate::error::AppResult;
use crate::extractors::CurrentUser;

pub struct PostCard {
    pub id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub image_path: Option<String>,
    pub likes: i64,
    pub dislikes: i64,
    pub categories: Vec<String>,
    pub user_liked: bool,
    pub user_disliked: bool,
}

pub struct CommentView {
    pub id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_liked: bool,
    pub user_disliked: bool,
}

/// Turn posts into cards, marking the viewer's own reactions.
pub fn post_cards(
    ledger: &ReactionLedger,
    viewer: Option<&CurrentUser>,
    posts: Vec<Post>,
) -> AppResult<Vec<PostCard>> {
    posts
        .into_iter()
        .map(|post| {
            let reaction = viewer_reaction(ledger, viewer, &Target::Post(post.id.clone()))?;
            Ok(PostCard {
                created_at: parse_and_format_time(&post.created_at),
                id: post.id,
                author: post.author,
                content: post.content,
                image_path: post.image_path,
                likes: post.likes,
                dislikes: post.dislikes,
                categories: post.categories,
                user_liked: reaction == Some(Polarity::Like),
                user_disliked: reaction == Some(Polarity::Dislike),
            })
        })
        .collect()
}

pub fn comment_views(
    ledger: &ReactionLedger,
    viewer: Option<&CurrentUser>,
    comments: Vec<Comment>,
) -> AppResult<Vec<CommentView>> {
    comments
        .into_iter()
        .map(|comment| {
            let reaction =
                viewer_reaction(ledger, viewer, &Target::Comment(comment.id.clone()))?;
            Ok(CommentView {
                created_at: parse_and_format_time(&comment.created_at),
                id: comment.id,
                author: comment.author,
                content: comment.content,
                likes: comment.likes,
                dislikes: comment.dislikes,
                user_liked: reaction == Some(Polarity::Like),
                user_disliked: reaction == Some(Polarity::Dislike),
            })
        })
        .collect()
}

fn viewer_reaction(
    ledger: &ReactionLedger,
    viewer: Option<&CurrentUser>,
    target: &Target,
) -> AppResult<Option<Polarity>> {
    match viewer {
        Some(user) => ledger.current_reaction(&user.id, target),
        None => Ok(None),
    }
}

// --- Time formatting ---

pub fn parse_and_format_time(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|_| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%d.%m.%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn format_relative_time_just_now() {
        let now = Utc::now().naive_utc();
        assert_eq!(format_relative_time(&now), "just now");
    }

    #[test]
    fn format_relative_time_minutes() {
        let dt = Utc::now().naive_utc() - chrono::Duration::minutes(5);
        assert_eq!(format_relative_time(&dt), "5m ago");
    }

    #[test]
    fn format_relative_time_hours() {
        let dt = Utc::now().naive_utc() - chrono::Duration::hours(3);
        assert_eq!(format_relative_time(&dt), "3h ago");
    }

    #[test]
    fn format_relative_time_old_date() {
        let dt = NaiveDate::from_ymd_opt(2024, 10, 31)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(format_relative_time(&dt), "31.10.2024 14:30");
    }

    #[test]
    fn parse_and_format_bad_input_returns_raw() {
        assert_eq!(parse_and_format_time("not-a-date"), "not-a-date");
    }
}
