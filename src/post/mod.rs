//! Posts and comments, with read visibility controlled by the
//! `is_public` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use validator::Validate;

use crate::error::{Error, Result};

/// Who is reading. Private posts are visible to members only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Viewer {
    Anonymous,
    Member(i64),
}

impl Viewer {
    fn authenticated(&self) -> bool {
        matches!(self, Viewer::Member(_))
    }
}

/// Post as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Comment as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
struct PostDraft<'a> {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be 1 to 200 characters long."
    ))]
    title: &'a str,
    #[validate(length(min = 1, message = "Content must not be empty."))]
    content: &'a str,
}

#[derive(Clone)]
pub struct PostRepository {
    pool: Pool<Postgres>,
}

impl PostRepository {
    /// Create a new [`PostRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a post; `is_public` defaults to true at the schema level,
    /// callers opt out explicitly.
    pub async fn create(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<Post> {
        PostDraft { title, content }.validate()?;

        let post = sqlx::query_as::<_, Post>(
            r#"INSERT INTO posts (author_id, title, content, is_public)
                VALUES ($1, $2, $3, $4)
                RETURNING *"#,
        )
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(is_public)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Find one post, honoring visibility: a private post does not exist
    /// for an anonymous viewer.
    pub async fn find(&self, post_id: i64, viewer: Viewer) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"SELECT * FROM posts WHERE id = $1"#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::PostNotFound)?;

        if !post.is_public && !viewer.authenticated() {
            return Err(Error::PostNotFound);
        }

        Ok(post)
    }

    /// Recent posts readable by `viewer`, newest first.
    pub async fn visible_to(
        &self,
        viewer: Viewer,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"SELECT * FROM posts
                WHERE is_public OR $1
                ORDER BY created_at DESC
                LIMIT $2"#,
        )
        .bind(viewer.authenticated())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Toggle the visibility flag; only the author may do so.
    pub async fn set_visibility(
        &self,
        post_id: i64,
        author_id: i64,
        is_public: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE posts SET is_public = $1
                WHERE id = $2 AND author_id = $3"#,
        )
        .bind(is_public)
        .bind(post_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the post is absent or the caller is not its author.
            let exists: Option<(i64,)> =
                sqlx::query_as(r#"SELECT id FROM posts WHERE id = $1"#)
                    .bind(post_id)
                    .fetch_optional(&self.pool)
                    .await?;

            return match exists {
                Some(_) => Err(Error::Forbidden(
                    "only the author may change a post's visibility",
                )),
                None => Err(Error::PostNotFound),
            };
        }

        tracing::debug!(post_id, is_public, "post visibility changed");
        Ok(())
    }

    /// Attach a comment to a post.
    pub async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (post_id, author_id, content)
                VALUES ($1, $2, $3)
                RETURNING *"#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    const PRIVATE_POST: i64 = 2;

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/posts.sql"))]
    async fn test_private_post_hidden_from_anonymous(pool: Pool<Postgres>) {
        let posts = PostRepository::new(pool);

        let listing = posts.visible_to(Viewer::Anonymous, 50).await.unwrap();
        assert!(listing.iter().all(|p| p.is_public));
        assert!(listing.iter().all(|p| p.id != PRIVATE_POST));

        let result = posts.find(PRIVATE_POST, Viewer::Anonymous).await;
        assert!(matches!(result, Err(Error::PostNotFound)));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/posts.sql"))]
    async fn test_private_post_visible_to_members(pool: Pool<Postgres>) {
        let posts = PostRepository::new(pool);

        let listing = posts
            .visible_to(Viewer::Member(BOB), 50)
            .await
            .unwrap();
        assert!(listing.iter().any(|p| p.id == PRIVATE_POST));

        let post = posts
            .find(PRIVATE_POST, Viewer::Member(BOB))
            .await
            .unwrap();
        assert!(!post.is_public);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/posts.sql"))]
    async fn test_listing_is_newest_first(pool: Pool<Postgres>) {
        let posts = PostRepository::new(pool);

        let listing = posts
            .visible_to(Viewer::Member(ALICE), 50)
            .await
            .unwrap();
        assert!(
            listing
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at)
        );
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/posts.sql"))]
    async fn test_set_visibility_author_only(pool: Pool<Postgres>) {
        let posts = PostRepository::new(pool);

        // Post 2 belongs to alice.
        let result = posts.set_visibility(PRIVATE_POST, BOB, true).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));

        posts.set_visibility(PRIVATE_POST, ALICE, true).await.unwrap();
        let post = posts
            .find(PRIVATE_POST, Viewer::Anonymous)
            .await
            .unwrap();
        assert!(post.is_public);

        let result = posts.set_visibility(999, ALICE, true).await;
        assert!(matches!(result, Err(Error::PostNotFound)));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_create_defaults_and_validation(pool: Pool<Postgres>) {
        let posts = PostRepository::new(pool);

        let result = posts.create(ALICE, "", "Some content.", true).await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let post = posts
            .create(ALICE, "A title", "Some content.", true)
            .await
            .unwrap();
        assert!(post.is_public);
        assert_eq!(post.author_id, ALICE);
    }
}
