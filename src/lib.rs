//! # Docshelf (Session, Authorization & Content Persistence)
//!
//! `docshelf` is the backend for a documentation/blog site. It owns the only
//! parts of the system with durable invariants:
//!
//! - **Credential store:** users with bcrypt password hashes and a unique
//!   email; plaintext passwords never touch the database and hashes are never
//!   returned to clients.
//! - **Stateless sessions:** a signed, time-bounded token (7 days) delivered
//!   as an `HttpOnly` cookie. There is no server-side session table; logout
//!   only clears the client cookie.
//! - **Role hierarchy:** a fixed total order `user < editor < admin`. Every
//!   authorization check re-reads the caller's role from the database; the
//!   token claim is identity only, never privilege.
//! - **Content stores:** slug-addressed posts plus per-user favorites, notes
//!   and visit history, all owned via cascading foreign keys.
//!
//! Presentation concerns (Markdown rendering, static assets, rate limiting)
//! are external collaborators and are not part of this crate.

pub mod api;
pub mod cli;
pub mod db;
