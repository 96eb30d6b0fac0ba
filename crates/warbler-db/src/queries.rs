use crate::Database;
use crate::Result;
use crate::models::{LikeRow, MessageRow, NewUser, UserRow};
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Users --

    /// Commit a pending signup. Duplicate username or email surfaces as
    /// `DbError::Integrity`.
    pub fn insert_user(&self, user: &NewUser) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, image_url, header_image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.password,
                    user.image_url,
                    user.header_image_url
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{USER_COLUMNS} WHERE id = ?1"),
                    [id],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{USER_COLUMNS} WHERE username = ?1"),
                    [username],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// All users, optionally filtered by a username substring.
    pub fn list_users(&self, q: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| match q {
            Some(q) => {
                let pattern = format!("%{}%", q);
                collect_users(
                    conn,
                    &format!("{USER_COLUMNS} WHERE username LIKE ?1 ORDER BY username"),
                    [pattern.as_str()],
                )
            }
            None => collect_users(
                conn,
                &format!("{USER_COLUMNS} ORDER BY username"),
                rusqlite::params![],
            ),
        })
    }

    /// Delete a user account. Owned messages, follow edges, and likes go
    /// with it via the cascading foreign keys.
    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Look up a user by exact username and verify the password against the
    /// stored hash. `Ok(None)` covers both an unknown username and a wrong
    /// password; an `Err` always means a system fault, never a failed login.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };

        if warbler_auth::verify_password(&user.password, password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, user_id: &str, text: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, user_id, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, text],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{MESSAGE_COLUMNS} WHERE m.id = ?1"),
                    [id],
                    message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_message(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            collect_messages(
                conn,
                &format!("{MESSAGE_COLUMNS} WHERE m.user_id = ?1 ORDER BY m.created_at DESC"),
                [user_id],
            )
        })
    }

    /// Home timeline: messages authored by the user or by anyone they
    /// follow, newest first.
    pub fn timeline(&self, user_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_COLUMNS}
                 WHERE m.user_id = ?1
                    OR m.user_id IN (
                        SELECT user_being_followed_id FROM follows
                        WHERE user_following_id = ?1)
                 ORDER BY m.created_at DESC
                 LIMIT ?2"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Follows --

    /// Record "follower follows followed". A duplicate edge violates the
    /// composite primary key and surfaces as `DbError::Integrity`.
    pub fn follow(&self, follower_id: &str, followed_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO follows (user_being_followed_id, user_following_id)
                 VALUES (?1, ?2)",
                rusqlite::params![followed_id, follower_id],
            )?;
            Ok(())
        })
    }

    pub fn unfollow(&self, follower_id: &str, followed_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                rusqlite::params![followed_id, follower_id],
            )?;
            Ok(())
        })
    }

    /// True iff `follower` has an edge pointing at `followed`.
    pub fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                rusqlite::params![followed_id, follower_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// True iff `other` has an edge pointing at `user`.
    pub fn is_followed_by(&self, user_id: &str, other_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                rusqlite::params![user_id, other_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Users following `user_id`.
    pub fn followers(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            collect_users(
                conn,
                &format!(
                    "{USER_COLUMNS}
                     WHERE id IN (
                        SELECT user_following_id FROM follows
                        WHERE user_being_followed_id = ?1)
                     ORDER BY username"
                ),
                [user_id],
            )
        })
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            collect_users(
                conn,
                &format!(
                    "{USER_COLUMNS}
                     WHERE id IN (
                        SELECT user_being_followed_id FROM follows
                        WHERE user_following_id = ?1)
                     ORDER BY username"
                ),
                [user_id],
            )
        })
    }

    // -- Likes --

    /// Toggle a like: removes the edge if it exists, inserts it if not.
    /// Returns true when the like was added, false when removed.
    pub fn toggle_like(&self, id: &str, user_id: &str, message_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM likes WHERE user_id = ?1 AND message_id = ?2",
                    rusqlite::params![user_id, message_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (id, user_id, message_id) VALUES (?1, ?2, ?3)",
                    rusqlite::params![id, user_id, message_id],
                )?;
                Ok(true)
            }
        })
    }

    /// Messages the user has liked, newest like first.
    pub fn likes_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            collect_messages(
                conn,
                &format!(
                    "{MESSAGE_COLUMNS}
                     JOIN likes l ON l.message_id = m.id
                     WHERE l.user_id = ?1
                     ORDER BY l.created_at DESC"
                ),
                [user_id],
            )
        })
    }

    /// Raw like edges for one message.
    pub fn likes_for_message(&self, message_id: &str) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message_id, created_at FROM likes WHERE message_id = ?1",
            )?;

            let rows = stmt
                .query_map([message_id], |row| {
                    Ok(LikeRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

const USER_COLUMNS: &str = "SELECT id, username, email, password, image_url, header_image_url, \
                            bio, location, created_at FROM users";

// JOIN users to carry the author's username in a single query
const MESSAGE_COLUMNS: &str = "SELECT m.id, m.user_id, u.username, m.text, m.created_at
                               FROM messages m
                               JOIN users u ON m.user_id = u.id";

fn user_from_row(row: &Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn message_from_row(row: &Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn collect_users<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn collect_messages<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_IMAGE_URL, SignupError};
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str, email: &str) -> UserRow {
        let pending = NewUser::signup(username, email, "password", None).unwrap();
        db.insert_user(&pending).unwrap();
        db.get_user_by_username(username).unwrap().unwrap()
    }

    fn post_message(db: &Database, user_id: &str, text: &str) -> MessageRow {
        let id = Uuid::new_v4().to_string();
        db.insert_message(&id, user_id, text).unwrap();
        db.get_message(&id).unwrap().unwrap()
    }

    #[test]
    fn signup_persists_one_user_with_hashed_password() {
        let db = db();
        let u = seed_user(&db, "testuser", "test@test.com");

        assert_eq!(u.username, "testuser");
        assert_eq!(u.email, "test@test.com");
        assert_ne!(u.password, "password");
        assert!(u.password.starts_with("$argon2"));
        assert_eq!(u.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(db.list_users(None).unwrap().len(), 1);
    }

    #[test]
    fn new_user_has_no_messages_or_followers() {
        let db = db();
        let u = seed_user(&db, "testuser2", "test2@test.com");

        assert!(db.messages_for_user(&u.id).unwrap().is_empty());
        assert!(db.followers(&u.id).unwrap().is_empty());
        assert!(db.following(&u.id).unwrap().is_empty());
    }

    #[test]
    fn signup_rejects_empty_password() {
        let err = NewUser::signup("testuser", "test@test.com", "", None).unwrap_err();
        assert!(matches!(err, SignupError::EmptyPassword));
    }

    #[test]
    fn duplicate_username_is_an_integrity_error() {
        let db = db();
        seed_user(&db, "testuser", "test@test.com");

        let dup = NewUser::signup("testuser", "other@test.com", "password", None).unwrap();
        let err = db.insert_user(&dup).unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(db.list_users(None).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_is_an_integrity_error() {
        let db = db();
        seed_user(&db, "testuser", "test@test.com");

        let dup = NewUser::signup("otheruser", "test@test.com", "password", None).unwrap();
        let err = db.insert_user(&dup).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn authenticate_returns_matching_user() {
        let db = db();
        let u = seed_user(&db, "testuser", "test@test.com");

        let found = db.authenticate("testuser", "password").unwrap().unwrap();
        assert_eq!(found.id, u.id);
    }

    #[test]
    fn authenticate_unknown_username_is_not_an_error() {
        let db = db();
        seed_user(&db, "testuser", "test@test.com");

        assert!(db.authenticate("nobody", "password").unwrap().is_none());
    }

    #[test]
    fn authenticate_wrong_password_is_not_an_error() {
        let db = db();
        seed_user(&db, "testuser", "test@test.com");

        assert!(db.authenticate("testuser", "wrongpass").unwrap().is_none());
    }

    #[test]
    fn follow_edge_updates_both_sides() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");

        db.follow(&u1.id, &u2.id).unwrap();

        let following = db.following(&u1.id).unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].id, u2.id);

        let followers = db.followers(&u2.id).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, u1.id);

        assert!(db.is_following(&u1.id, &u2.id).unwrap());
        assert!(db.is_followed_by(&u2.id, &u1.id).unwrap());

        // none of the reverse relations hold
        assert!(!db.is_following(&u2.id, &u1.id).unwrap());
        assert!(!db.is_followed_by(&u1.id, &u2.id).unwrap());
        assert!(db.followers(&u1.id).unwrap().is_empty());
        assert!(db.following(&u2.id).unwrap().is_empty());
    }

    #[test]
    fn duplicate_follow_edge_is_an_integrity_error() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");

        db.follow(&u1.id, &u2.id).unwrap();
        let err = db.follow(&u1.id, &u2.id).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn unfollow_removes_the_edge() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");

        db.follow(&u1.id, &u2.id).unwrap();
        db.unfollow(&u1.id, &u2.id).unwrap();

        assert!(!db.is_following(&u1.id, &u2.id).unwrap());
        assert!(db.followers(&u2.id).unwrap().is_empty());
    }

    #[test]
    fn message_belongs_to_its_author() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");

        post_message(&db, &u1.id, "Hi");

        let messages = db.messages_for_user(&u1.id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "Hi");
        assert_eq!(messages[0].username, "test1");
    }

    #[test]
    fn delete_message_removes_it() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let m = post_message(&db, &u1.id, "Hi");

        db.delete_message(&m.id).unwrap();

        assert!(db.get_message(&m.id).unwrap().is_none());
        assert!(db.messages_for_user(&u1.id).unwrap().is_empty());
    }

    #[test]
    fn like_toggle_adds_then_removes() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");
        let m = post_message(&db, &u1.id, "Hi");

        let added = db
            .toggle_like(&Uuid::new_v4().to_string(), &u2.id, &m.id)
            .unwrap();
        assert!(added);
        assert_eq!(db.likes_for_message(&m.id).unwrap().len(), 1);

        let added = db
            .toggle_like(&Uuid::new_v4().to_string(), &u2.id, &m.id)
            .unwrap();
        assert!(!added);
        assert!(db.likes_for_message(&m.id).unwrap().is_empty());
    }

    #[test]
    fn like_edge_records_user_and_message() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");
        let m = post_message(&db, &u1.id, "Hi");

        db.toggle_like(&Uuid::new_v4().to_string(), &u2.id, &m.id)
            .unwrap();

        let likes = db.likes_for_message(&m.id).unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].message_id, m.id);
        assert_eq!(likes[0].user_id, u2.id);

        let liked = db.likes_for_user(&u2.id).unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].text, "Hi");
    }

    #[test]
    fn deleting_a_user_cascades() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");
        let m = post_message(&db, &u1.id, "Hi");

        db.follow(&u2.id, &u1.id).unwrap();
        db.toggle_like(&Uuid::new_v4().to_string(), &u2.id, &m.id)
            .unwrap();

        db.delete_user(&u1.id).unwrap();

        assert!(db.get_user_by_id(&u1.id).unwrap().is_none());
        assert!(db.get_message(&m.id).unwrap().is_none());
        assert!(db.likes_for_message(&m.id).unwrap().is_empty());
        assert!(db.following(&u2.id).unwrap().is_empty());
    }

    #[test]
    fn timeline_covers_self_and_followed_users() {
        let db = db();
        let u1 = seed_user(&db, "test1", "test1@test.com");
        let u2 = seed_user(&db, "test2", "test2@test.com");
        let u3 = seed_user(&db, "test3", "test3@test.com");

        db.follow(&u1.id, &u2.id).unwrap();
        post_message(&db, &u1.id, "mine");
        post_message(&db, &u2.id, "followed");
        post_message(&db, &u3.id, "stranger");

        let timeline = db.timeline(&u1.id, 100).unwrap();
        let texts: Vec<_> = timeline.iter().map(|m| m.text.as_str()).collect();

        assert_eq!(timeline.len(), 2);
        assert!(texts.contains(&"mine"));
        assert!(texts.contains(&"followed"));
        assert!(!texts.contains(&"stranger"));
    }

    #[test]
    fn list_users_filters_by_substring() {
        let db = db();
        seed_user(&db, "warble", "w@test.com");
        seed_user(&db, "other", "o@test.com");

        let all = db.list_users(None).unwrap();
        assert_eq!(all.len(), 2);

        let filtered = db.list_users(Some("warb")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].username, "warble");
    }
}
