// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative list of bus subjects.

// Request/reply subjects handled by the auth service.
pub const AUTH_REGISTER: &str = "auth.register";
pub const AUTH_LOGIN: &str = "auth.login";
pub const AUTH_REFRESH: &str = "auth.refresh";
pub const AUTH_VALIDATE: &str = "auth.validate";
pub const AUTH_LOGOUT: &str = "auth.logout";
pub const AUTH_LOGOUT_ALL: &str = "auth.logout_all";
pub const AUTH_CHANGE_PASSWORD: &str = "auth.change_password";

// Event subjects published by the auth service.
pub const AUTH_USER_REGISTERED: &str = "auth.user.registered";
pub const AUTH_USER_LOGIN: &str = "auth.user.login";
pub const AUTH_USER_LOGOUT: &str = "auth.user.logout";
pub const AUTH_PASSWORD_RESET: &str = "auth.password.reset";
pub const AUTH_REGISTRATION_REQUESTED: &str = "auth.registration.requested";

// Event subjects the auth service subscribes to (from the admin service).
pub const ADMIN_REGISTRATION_APPROVED: &str = "admin.registration.approved";
pub const ADMIN_REGISTRATION_REJECTED: &str = "admin.registration.rejected";

// Request/reply subjects handled by the document service.
pub const DOCUMENTS_LIST: &str = "documents.list";
pub const DOCUMENTS_GET: &str = "documents.get";
pub const DOCUMENTS_CREATE: &str = "documents.create";
pub const DOCUMENTS_UPDATE: &str = "documents.update";
pub const DOCUMENTS_DELETE: &str = "documents.delete";

// Stream subject consumed by the index service.
pub const INDEX_DOCUMENTS: &str = "index.documents";
