//! Input rules for the user store. Every function here is pure: it takes a
//! raw request and returns either a typed, validated value or an
//! `AppError::Validation` listing every violated field.

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::users::dto::{CreateUserRequest, ListUsersQuery, UpdateUserRequest};
use crate::users::repo_types::{Role, UserChanges, UserFilter};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 255;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 255;
const SEARCH_MAX: usize = 255;
const AGE_MIN: i64 = 1;
const AGE_MAX: i64 = 150;
const LIMIT_MAX: i64 = 100;
/// Largest integer a JSON client can send without losing precision (2^53 - 1).
const PAGE_MAX: i64 = 9_007_199_254_740_991;
const PHONE_PATTERN: &str = r"^\+?[1-9]\d{1,14}$";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$"
    )
    .unwrap();
    static ref PHONE_RE: Regex = Regex::new(PHONE_PATTERN).unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Validated create input. The password is still plaintext; hashing is the
/// service's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, msg: String) {
        self.0.push(msg);
    }

    fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(format!("\"{field}\" is required"));
        }
        value
    }

    fn text(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len == 0 {
            self.push(format!("\"{field}\" is not allowed to be empty"));
        } else if len < min {
            self.push(format!(
                "\"{field}\" length must be at least {min} characters long"
            ));
        } else if len > max {
            self.push(format!(
                "\"{field}\" length must be less than or equal to {max} characters long"
            ));
        }
    }

    fn email(&mut self, value: &str) {
        if value.is_empty() {
            self.push("\"email\" is not allowed to be empty".into());
        } else if value.chars().count() > EMAIL_MAX {
            self.push(format!(
                "\"email\" length must be less than or equal to {EMAIL_MAX} characters long"
            ));
        } else if !is_valid_email(value) {
            self.push("\"email\" must be a valid email".into());
        }
    }

    fn range(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min {
            self.push(format!("\"{field}\" must be greater than or equal to {min}"));
        } else if value > max {
            self.push(format!("\"{field}\" must be less than or equal to {max}"));
        }
    }

    fn phone(&mut self, value: &str) {
        if value.is_empty() {
            self.push("\"phone\" is not allowed to be empty".into());
        } else if !is_valid_phone(value) {
            self.push(format!(
                "\"phone\" with value \"{value}\" fails to match the required pattern: /{PHONE_PATTERN}/"
            ));
        }
    }

    fn role(&mut self, value: &str) -> Option<Role> {
        match value.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                self.push("\"role\" must be one of [admin, user]".into());
                None
            }
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> AppResult<T> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}

pub fn validate_create(req: CreateUserRequest) -> AppResult<NewUser> {
    let mut v = Violations::default();

    let first_name = v.required("firstName", req.first_name);
    if let Some(name) = &first_name {
        v.text("firstName", name, NAME_MIN, NAME_MAX);
    }
    let last_name = v.required("lastName", req.last_name);
    if let Some(name) = &last_name {
        v.text("lastName", name, NAME_MIN, NAME_MAX);
    }
    let email = v.required("email", req.email);
    if let Some(email) = &email {
        v.email(email);
    }
    let password = v.required("password", req.password);
    if let Some(password) = &password {
        v.text("password", password, PASSWORD_MIN, PASSWORD_MAX);
    }
    if let Some(age) = req.age {
        v.range("age", age, AGE_MIN, AGE_MAX);
    }
    if let Some(phone) = &req.phone {
        v.phone(phone);
    }
    let role = req.role.as_deref().and_then(|r| v.role(r));

    v.finish(|| NewUser {
        first_name: first_name.unwrap_or_default(),
        last_name: last_name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
        age: req.age.map(|a| a as i32),
        phone: req.phone,
        role: role.unwrap_or_default(),
    })
}

pub fn validate_update(req: UpdateUserRequest) -> AppResult<UserChanges> {
    let mut v = Violations::default();

    if let Some(name) = &req.first_name {
        v.text("firstName", name, NAME_MIN, NAME_MAX);
    }
    if let Some(name) = &req.last_name {
        v.text("lastName", name, NAME_MIN, NAME_MAX);
    }
    if let Some(email) = &req.email {
        v.email(email);
    }
    if let Some(age) = req.age {
        v.range("age", age, AGE_MIN, AGE_MAX);
    }
    if let Some(phone) = &req.phone {
        v.phone(phone);
    }
    let role = req.role.as_deref().and_then(|r| v.role(r));

    v.finish(|| UserChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        age: req.age.map(|a| a as i32),
        phone: req.phone,
        role,
        is_active: req.is_active,
    })
}

pub fn validate_query(query: ListUsersQuery) -> AppResult<UserFilter> {
    let mut v = Violations::default();
    let defaults = UserFilter::default();

    let page = query.page.unwrap_or(defaults.page);
    v.range("page", page, 1, PAGE_MAX);
    let limit = query.limit.unwrap_or(defaults.limit);
    v.range("limit", limit, 1, LIMIT_MAX);
    if let Some(search) = &query.search {
        v.text("search", search, 1, SEARCH_MAX);
    }
    let role = query.role.as_deref().and_then(|r| v.role(r));

    v.finish(|| UserFilter {
        search: query.search,
        role,
        is_active: query.is_active,
        page,
        limit,
    })
}

pub fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation("\"id\" must be a valid GUID"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> CreateUserRequest {
        CreateUserRequest {
            first_name: Some("Ann".into()),
            last_name: Some("Lee".into()),
            email: Some("ann@x.com".into()),
            password: Some("secret1".into()),
            ..CreateUserRequest::default()
        }
    }

    fn messages(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(msgs) => msgs,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn minimal_create_gets_defaults() {
        let user = validate_create(ann()).unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.age, None);
        assert_eq!(user.phone, None);
    }

    #[test]
    fn age_boundaries() {
        for (age, ok) in [(0, false), (1, true), (150, true), (151, false)] {
            let req = CreateUserRequest { age: Some(age), ..ann() };
            assert_eq!(validate_create(req).is_ok(), ok, "age {age}");
        }
        let err = validate_update(UpdateUserRequest { age: Some(151), ..Default::default() });
        assert_eq!(
            messages(err.unwrap_err()),
            vec!["\"age\" must be less than or equal to 150"]
        );
    }

    #[test]
    fn reports_every_violated_field() {
        let req = CreateUserRequest {
            first_name: Some("A".into()),
            last_name: None,
            email: Some("not-an-email".into()),
            password: Some("123".into()),
            phone: Some("0123".into()),
            role: Some("root".into()),
            ..CreateUserRequest::default()
        };
        let msgs = messages(validate_create(req).unwrap_err());
        assert_eq!(
            msgs,
            vec![
                "\"firstName\" length must be at least 2 characters long".to_string(),
                "\"lastName\" is required".to_string(),
                "\"email\" must be a valid email".to_string(),
                "\"password\" length must be at least 6 characters long".to_string(),
                "\"phone\" with value \"0123\" fails to match the required pattern: /^\\+?[1-9]\\d{1,14}$/".to_string(),
                "\"role\" must be one of [admin, user]".to_string(),
            ]
        );
    }

    #[test]
    fn name_length_upper_bound_counts_chars() {
        let name = "é".repeat(100);
        assert!(validate_create(CreateUserRequest { first_name: Some(name), ..ann() }).is_ok());
        let name = "a".repeat(101);
        assert!(validate_create(CreateUserRequest { first_name: Some(name), ..ann() }).is_err());
    }

    #[test]
    fn phone_pattern() {
        assert!(is_valid_phone("+14155552671"));
        assert!(is_valid_phone("14155552671"));
        assert!(!is_valid_phone("+0123"));
        assert!(!is_valid_phone("1"));
        assert!(!is_valid_phone("+1234567890123456"));
        assert!(!is_valid_phone("555-1234"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ann@x.com"));
        assert!(is_valid_email("ann.lee+tag@mail.example.org"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("ann@x.com."));
        assert!(!is_valid_email("ann@x..com"));
        assert!(!is_valid_email("ann@-x.com"));
        assert!(!is_valid_email("ann lee@x.com"));
        assert!(!is_valid_email("ann@x"));
    }

    #[test]
    fn update_checks_phone_and_email() {
        let req = UpdateUserRequest {
            email: Some("ann@x.c".into()),
            phone: Some("555-1234".into()),
            ..Default::default()
        };
        assert_eq!(
            messages(validate_update(req).unwrap_err()),
            vec![
                "\"email\" must be a valid email".to_string(),
                "\"phone\" with value \"555-1234\" fails to match the required pattern: /^\\+?[1-9]\\d{1,14}$/".to_string(),
            ]
        );
        let ok = UpdateUserRequest { phone: Some("+14155552671".into()), ..Default::default() };
        assert_eq!(validate_update(ok).unwrap().phone.as_deref(), Some("+14155552671"));
    }

    #[test]
    fn empty_update_is_valid() {
        assert_eq!(validate_update(UpdateUserRequest::default()).unwrap(), UserChanges::default());
    }

    #[test]
    fn query_defaults_and_bounds() {
        let filter = validate_query(ListUsersQuery::default()).unwrap();
        assert_eq!((filter.page, filter.limit), (1, 10));

        let err = validate_query(ListUsersQuery { page: Some(0), limit: Some(101), ..Default::default() });
        assert_eq!(
            messages(err.unwrap_err()),
            vec![
                "\"page\" must be greater than or equal to 1",
                "\"limit\" must be less than or equal to 100"
            ]
        );

        let err = validate_query(ListUsersQuery { limit: Some(0), ..Default::default() });
        assert_eq!(
            messages(err.unwrap_err()),
            vec!["\"limit\" must be greater than or equal to 1"]
        );

        let last = validate_query(ListUsersQuery { page: Some(PAGE_MAX), ..Default::default() });
        assert_eq!(last.unwrap().page, PAGE_MAX);
        let err = validate_query(ListUsersQuery { page: Some(PAGE_MAX + 1), ..Default::default() });
        assert_eq!(
            messages(err.unwrap_err()),
            vec!["\"page\" must be less than or equal to 9007199254740991"]
        );

        let ok = validate_query(ListUsersQuery { limit: Some(100), role: Some("admin".into()), ..Default::default() });
        assert_eq!(ok.unwrap().role, Some(Role::Admin));
    }

    #[test]
    fn query_rejects_empty_search() {
        let err = validate_query(ListUsersQuery { search: Some(String::new()), ..Default::default() });
        assert!(err.is_err());
    }

    #[test]
    fn parse_user_id_rejects_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(&id.to_string()).unwrap(), id);
        let err = parse_user_id("123").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: \"id\" must be a valid GUID");
    }
}
