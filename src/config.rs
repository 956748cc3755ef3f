use std::env;

const DEFAULT_REMEMBER_DAYS: i64 = 365 * 20;
/// Upper bound for session lifetime; larger values overflow date arithmetic.
const MAX_REMEMBER_DAYS: i64 = 365 * 100;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub session_secret: String,
    pub session_key: String,
    pub token_header: String,
    pub front_domain: String,
    pub per_page: u64,
    pub bcrypt_cost: u32,
    pub remember_days: i64,
    pub seed_admin: Option<SeedAdmin>,
}

/// Administrator created on startup when `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set.
#[derive(Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        let sqlite_path = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "./data/servertracker.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok();

        let session_secret = env::var("SESSION_SECRET")
            .unwrap_or_else(|_| "servertracker-development-secret-change-me".to_string());
        let session_key =
            env::var("SESSION_KEY").unwrap_or_else(|_| "_servertracker_session".to_string());
        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "token".to_string());
        let front_domain = env::var("FRONT_DOMAIN").unwrap_or_default();

        let per_page = env::var("PER_PAGE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(30);
        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let remember_days = parse_remember_days(env::var("REMEMBER_DAYS").ok().as_deref());

        let seed_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => Some(SeedAdmin {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Self {
            server_port,
            sqlite_path,
            database_url,
            session_secret,
            session_key,
            token_header,
            front_domain,
            per_page,
            bcrypt_cost,
            remember_days,
            seed_admin,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }
}

fn parse_remember_days(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_REMEMBER_DAYS)
        .clamp(1, MAX_REMEMBER_DAYS)
}
