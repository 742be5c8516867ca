use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::auth::{NewUser, User, UserChangeset};

pub struct UserRepo;

impl UserRepo {
    pub fn exists_by_email(
        conn: &mut PgConnection,
        email_val: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        diesel::select(diesel::dsl::exists(users.filter(email.eq(email_val)))).get_result(conn)
    }

    pub fn find_by_email(
        conn: &mut PgConnection,
        email_val: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(email.eq(email_val))
            .select(User::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(id.eq(user_id))
            .select(User::as_select())
            .first(conn)
            .optional()
    }

    pub fn count(conn: &mut PgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users.count().get_result(conn)
    }

    /// Blocks concurrent writers until the surrounding transaction ends.
    pub fn lock_table(conn: &mut PgConnection) -> Result<(), diesel::result::Error> {
        diesel::sql_query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(conn)
            .map(|_| ())
    }

    pub fn list(conn: &mut PgConnection) -> Result<Vec<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .order(created_at.desc())
            .select(User::as_select())
            .load(conn)
    }

    pub fn insert(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, diesel::result::Error> {
        diesel::insert_into(crate::schema::users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        user_id: Uuid,
        changes: &UserChangeset,
    ) -> Result<User, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        diesel::update(users.filter(id.eq(user_id)))
            .set(changes)
            .returning(User::as_returning())
            .get_result(conn)
    }

    pub fn delete_by_id(conn: &mut PgConnection, user_id: Uuid) -> Result<usize, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        diesel::delete(users.filter(id.eq(user_id))).execute(conn)
    }
}
