// Life of a login request:
// 1. JSON comes in on POST /api/login (routes)
// 2. AuthCore normalises the email and looks it up in the CredentialStore
// 3. One Argon2 verification runs, against the stored hash or a dummy hash
// 4. On a match, SessionIssuer signs a JWT with the server secret
// 5. routes turns the outcome into a status code, JSON body and cookie
//
// System components:
//  - Credential store (lookup by email)
//  - Password hasher
//  - Session issuer

pub mod auth;
pub mod config;
pub mod routes;
#[cfg(test)]
mod testing;
pub mod time;
pub mod types;
