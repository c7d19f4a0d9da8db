mod health;
mod user;
