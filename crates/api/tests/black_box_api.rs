use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use orgusers_api::app::{build_app, AppServices};
use orgusers_auth::{Argon2Hasher, JwtClaims, PasswordHasher};
use orgusers_core::{GroupId, OrganizationId, UserId};
use orgusers_directory::{EmailAddress, MembershipPlan, Organization, OrganizationUser, User, UserChanges};
use orgusers_infra::{ensure_default_groups, InMemoryDirectoryStore, UserUpdate, UserWrite};

const JWT_SECRET: &str = "test-secret";
const ADMINISTRATOR: GroupId = GroupId::new(2);

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    hasher: Argon2Hasher,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let hasher = Argon2Hasher::with_cost(1024, 1, 1).unwrap();
        let services = Arc::new(AppServices::new(
            InMemoryDirectoryStore::arc(),
            Arc::new(hasher.clone()),
        ));
        ensure_default_groups(services.store().as_ref()).await.unwrap();

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services.clone(), JWT_SECRET.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            hasher,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn user(&self, username: &str, password: &str, setup: impl FnOnce(&mut User)) -> User {
        let mut user = User::new(
            username,
            format!("{username}@test.com"),
            self.hasher.hash(password).unwrap(),
            Utc::now(),
        );
        setup(&mut user);
        let mut write = UserWrite::new(user.clone());
        write.primary_email = Some(EmailAddress::new(user.id, user.email.clone(), true, true));
        self.services.store().insert_user(write).await.unwrap()
    }

    async fn superuser(&self) -> User {
        self.user("admin", "tester", |u| {
            u.is_superuser = true;
            u.is_staff = true;
        })
        .await
    }

    /// A non-superuser in the Administrator group that administers `org`.
    async fn org_manager(&self, username: &str, org: OrganizationId) -> User {
        let user = self
            .user(username, "tester", |u| {
                u.groups.insert(ADMINISTRATOR);
            })
            .await;
        self.join(&user, org, true).await;
        user
    }

    async fn join(&self, user: &User, org: OrganizationId, is_admin: bool) -> OrganizationUser {
        let membership = OrganizationUser::new(user.id, org, is_admin, Utc::now());
        self.services
            .store()
            .update_user(UserUpdate {
                id: user.id,
                changes: UserChanges::default(),
                memberships: MembershipPlan {
                    create: vec![membership.clone()],
                    ..Default::default()
                },
                primary_email: None,
            })
            .await
            .unwrap();
        membership
    }

    async fn org(&self, name: &str) -> Organization {
        self.services
            .store()
            .insert_organization(Organization::new(name, name, Utc::now()))
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user: UserId) -> String {
    let now = Utc::now();
    let claims = JwtClaims::new(user, now, now + ChronoDuration::minutes(10));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn send(req: reqwest::RequestBuilder, user: &User) -> (StatusCode, Value) {
    let res = req.bearer_auth(mint_jwt(user.id)).send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

// ─────────────────────────── authentication ───────────────────────────

#[tokio::test]
async fn health_is_public_and_api_requires_a_token() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Valid signature, but the subject does not exist.
    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(UserId::new()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_caller_and_managed_organizations() {
    let srv = TestServer::spawn().await;
    let org = srv.org("org1").await;
    let manager = srv.org_manager("manager", org.id).await;

    let (status, body) = send(srv.client.get(srv.url("/whoami")), &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "manager");
    assert_eq!(body["is_superuser"], false);
    assert_eq!(body["managed_organizations"], json!([org.id.to_string()]));
}

#[tokio::test]
async fn inactive_users_are_rejected() {
    let srv = TestServer::spawn().await;
    let inactive = srv.user("inactive", "tester", |u| u.is_active = false).await;

    let (status, _) = send(srv.client.get(srv.url("/whoami")), &inactive).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ──────────────────────────── organizations ───────────────────────────

#[tokio::test]
async fn superuser_organization_lifecycle() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;

    let (status, created) = send(
        srv.client
            .post(srv.url("/user/organization/"))
            .json(&json!({ "name": "test org", "slug": "test-org" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["owner"], Value::Null);
    let id = created["id"].as_str().unwrap().to_string();
    let path = format!("/user/organization/{id}/");

    let (status, list) = send(srv.client.get(srv.url("/user/organization/")), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);

    let (status, body) = send(
        srv.client.put(srv.url(&path)).json(&json!({
            "name": "test org change",
            "slug": "test-org-change",
            "is_active": false,
            "description": "testing PUT",
            "email": "testorg@test.com",
            "url": "",
        })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "test org change");
    assert_eq!(body["is_active"], false);

    let (status, body) = send(
        srv.client.patch(srv.url(&path)).json(&json!({ "description": "testing PATCH" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "testing PATCH");
    assert_eq!(body["slug"], "test-org-change");

    let (status, body) = send(srv.client.put(srv.url(&path)).json(&json!({ "name": "x" })), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["slug"].is_array());

    let (status, _) = send(srv.client.delete(srv.url(&path)), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(srv.client.get(srv.url(&path)), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn organization_owner_nested_write() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;
    let org = srv.org("org1").await;
    let other = srv.org("org2").await;
    let tester = srv.user("tester", "tester", |_| {}).await;
    let membership = srv.join(&tester, org.id, true).await;
    let foreign = srv.join(&tester, other.id, false).await;
    let path = format!("/user/organization/{}/", org.id);

    let (status, body) = send(
        srv.client
            .patch(srv.url(&path))
            .json(&json!({ "owner": { "organization_user": membership.id.to_string() } })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["owner"]["organization_user"], membership.id.to_string());

    let (status, body) = send(
        srv.client
            .patch(srv.url(&path))
            .json(&json!({ "owner": { "organization_user": foreign.id.to_string() } })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["owner.organization_user"].is_array());

    let (status, body) = send(
        srv.client
            .patch(srv.url(&path))
            .json(&json!({ "owner": { "organization_user": "" } })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], Value::Null);
}

#[tokio::test]
async fn org_manager_sees_only_managed_organizations() {
    let srv = TestServer::spawn().await;
    let org1 = srv.org("org1").await;
    let org2 = srv.org("org2").await;
    let manager = srv.org_manager("manager", org1.id).await;

    let (status, list) = send(srv.client.get(srv.url("/user/organization/")), &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["id"], org1.id.to_string());

    let (status, _) = send(
        srv.client.get(srv.url(&format!("/user/organization/{}/", org2.id))),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Administrators may change organizations but not create them.
    let (status, _) = send(
        srv.client
            .post(srv.url("/user/organization/"))
            .json(&json!({ "name": "new", "slug": "new" })),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn users_without_permissions_are_forbidden() {
    let srv = TestServer::spawn().await;
    let org = srv.org("org1").await;
    let operator = srv.user("operator", "tester", |u| {
        u.groups.insert(GroupId::new(1));
    })
    .await;
    srv.join(&operator, org.id, true).await;

    for path in ["/user/organization/", "/user/users/", "/user/group/"] {
        let (status, body) = send(srv.client.get(srv.url(path)), &operator).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(body["error"], "forbidden");
    }
}

// ──────────────────────────────── users ───────────────────────────────

#[tokio::test]
async fn superuser_creates_user_with_single_membership_object() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;
    let org = srv.org("org1").await;

    let (status, body) = send(
        srv.client.post(srv.url("/user/users/")).json(&json!({
            "username": "tester",
            "email": "tester@test.com",
            "password": "password123",
            "organization_users": { "organization": org.id.to_string(), "is_admin": false },
            "groups": [1],
            "user_permissions": [1, 2],
        })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["groups"], json!([1]));
    assert_eq!(body["user_permissions"], json!([1, 2]));
    assert_eq!(body["is_superuser"], false);
    assert_eq!(body["organization_users"][0]["organization"], org.id.to_string());
    assert!(body.get("password").is_none());

    let id = body["id"].as_str().unwrap();
    let (status, email) = send(srv.client.get(srv.url(&format!("/user/users/{id}/email/"))), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(email, json!({ "email": "tester@test.com", "verified": false, "primary": true }));

    let (status, body) = send(
        srv.client.post(srv.url("/user/users/")).json(&json!({
            "username": "tester",
            "email": "other@test.com",
            "password": "password123",
        })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["username"], json!(["user with this username already exists."]));
}

#[tokio::test]
async fn org_manager_gets_restricted_user_shape() {
    let srv = TestServer::spawn().await;
    let _admin = srv.superuser().await;
    let org1 = srv.org("org1").await;
    let org2 = srv.org("org2").await;
    let manager = srv.org_manager("manager", org1.id).await;

    let member = srv.user("member", "tester", |_| {}).await;
    srv.join(&member, org1.id, false).await;
    srv.join(&member, org2.id, false).await;
    let stranger = srv.user("stranger", "tester", |_| {}).await;
    srv.join(&stranger, org2.id, false).await;

    let (status, list) = send(srv.client.get(srv.url("/user/users/")), &manager).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = list["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["member", "manager"]);

    let (status, body) = send(
        srv.client.get(srv.url(&format!("/user/users/{}/", member.id))),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("is_superuser").is_none());
    assert!(body.get("user_permissions").is_none());
    assert_eq!(body["organization_users"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        srv.client.get(srv.url(&format!("/user/users/{}/", stranger.id))),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // is_superuser is read-only for managers and silently dropped.
    let (status, body) = send(
        srv.client
            .patch(srv.url(&format!("/user/users/{}/", member.id)))
            .json(&json!({ "is_superuser": true, "bio": "updated" })),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["bio"], "updated");
    let stored = srv.services.store().get_user(member.id).await.unwrap().unwrap();
    assert!(!stored.is_superuser);
}

#[tokio::test]
async fn membership_toggle_through_patch() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;
    let org = srv.org("org1").await;
    let tester = srv.user("tester", "tester", |_| {}).await;
    let path = format!("/user/users/{}/", tester.id);
    let toggle = |is_admin: bool| json!({ "organization_users": [{ "organization": org.id.to_string(), "is_admin": is_admin }] });

    let (status, body) = send(srv.client.patch(srv.url(&path)).json(&toggle(false)), &admin).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["organization_users"][0]["is_admin"], false);

    let (_, body) = send(srv.client.patch(srv.url(&path)).json(&toggle(true)), &admin).await;
    assert_eq!(body["organization_users"][0]["is_admin"], true);

    let (_, body) = send(srv.client.patch(srv.url(&path)).json(&toggle(true)), &admin).await;
    assert_eq!(body["organization_users"], json!([]));

    let (_, body) = send(srv.client.patch(srv.url(&path)).json(&toggle(false)), &admin).await;
    assert_eq!(body["organization_users"].as_array().unwrap().len(), 1);
    let (_, body) = send(
        srv.client.patch(srv.url(&path)).json(&json!({ "organization_users": [] })),
        &admin,
    )
    .await;
    assert_eq!(body["organization_users"], json!([]));
}

#[tokio::test]
async fn user_put_and_delete() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;
    let tester = srv.user("tester", "tester", |_| {}).await;
    let path = format!("/user/users/{}/", tester.id);

    let (status, body) = send(
        srv.client.put(srv.url(&path)).json(&json!({
            "username": "changetestuser",
            "email": "changetest@tester.com",
        })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["username"], "changetestuser");
    assert_eq!(body["email"], "changetest@tester.com");

    let (status, body) = send(srv.client.put(srv.url(&path)).json(&json!({ "username": "x" })), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());

    let (status, _) = send(srv.client.delete(srv.url(&path)), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(srv.services.store().get_user(tester.id).await.unwrap().is_none());
    assert!(srv.services.store().email_addresses(tester.id).await.unwrap().is_empty());
}

// ─────────────────────────── change password ──────────────────────────

#[tokio::test]
async fn change_password() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;
    let path = format!("/user/users/{}/changepassword/", admin.id);

    let (status, body) = send(
        srv.client
            .put(srv.url(&path))
            .json(&json!({ "old_password": "wrong", "new_password": "newpassword" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["old_password"], json!(["You have entered a wrong password."]));

    let (status, body) = send(
        srv.client
            .put(srv.url(&path))
            .json(&json!({ "old_password": "tester", "new_password": "newpassword" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "message": "Password updated successfully" }));

    let stored = srv.services.store().get_user(admin.id).await.unwrap().unwrap();
    assert!(srv.hasher.verify("newpassword", &stored.password_hash));
}

#[tokio::test]
async fn org_manager_changes_password_of_managed_members_only() {
    let srv = TestServer::spawn().await;
    let org1 = srv.org("org1").await;
    let org2 = srv.org("org2").await;
    let manager = srv.org_manager("manager", org1.id).await;
    let member = srv.user("member", "tester", |_| {}).await;
    srv.join(&member, org1.id, false).await;
    let outsider = srv.user("outsider", "tester", |_| {}).await;
    srv.join(&outsider, org2.id, false).await;
    let body = json!({ "old_password": "tester", "new_password": "newpassword" });

    let (status, _) = send(
        srv.client
            .put(srv.url(&format!("/user/users/{}/changepassword/", member.id)))
            .json(&body),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = srv.services.store().get_user(member.id).await.unwrap().unwrap();
    assert!(srv.hasher.verify("newpassword", &stored.password_hash));

    let (status, _) = send(
        srv.client
            .put(srv.url(&format!("/user/users/{}/changepassword/", outsider.id)))
            .json(&body),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let stored = srv.services.store().get_user(outsider.id).await.unwrap().unwrap();
    assert!(srv.hasher.verify("tester", &stored.password_hash));
}

// ──────────────────────────────── email ───────────────────────────────

#[tokio::test]
async fn org_manager_reads_email_of_managed_members_only() {
    let srv = TestServer::spawn().await;
    let org1 = srv.org("org1").await;
    let org2 = srv.org("org2").await;
    let manager = srv.org_manager("manager", org1.id).await;
    let member = srv.user("member", "tester", |_| {}).await;
    srv.join(&member, org1.id, false).await;
    let outsider = srv.user("outsider", "tester", |_| {}).await;
    srv.join(&outsider, org2.id, false).await;

    let (status, body) = send(
        srv.client.get(srv.url(&format!("/user/users/{}/email/", member.id))),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "member@test.com");

    let outsider_email = format!("/user/users/{}/email/", outsider.id);
    let (status, _) = send(srv.client.get(srv.url(&outsider_email)), &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        srv.client.patch(srv.url(&outsider_email)).json(&json!({ "email": "taken@test.com" })),
        &manager,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let stored = srv.services.store().get_user(outsider.id).await.unwrap().unwrap();
    assert_eq!(stored.email, "outsider@test.com");
}

#[tokio::test]
async fn email_endpoint() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;
    let path = format!("/user/users/{}/email/", admin.id);

    let (status, body) = send(srv.client.get(srv.url(&path)), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "admin@test.com");

    let (status, body) = send(srv.client.put(srv.url(&path)).json(&json!({ "email": "email.com" })), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"], json!(["Enter a valid email address."]));

    let (status, body) = send(
        srv.client.patch(srv.url(&path)).json(&json!({ "email": "newemail@test.com" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "newemail@test.com");
    let stored = srv.services.store().get_user(admin.id).await.unwrap().unwrap();
    assert_eq!(stored.email, "newemail@test.com");

    let (status, _) = send(srv.client.delete(srv.url(&path)), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(srv.client.get(srv.url(&path)), &admin).await;
    assert_eq!(body, json!({ "email": "Email not found" }));
}

// ─────────────────────────────── groups ───────────────────────────────

#[tokio::test]
async fn unreadable_bodies_get_the_json_error_shape() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;

    let (status, body) = send(
        srv.client
            .post(srv.url("/user/group/"))
            .header("content-type", "application/json")
            .body("{not json"),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "parse_error");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let (status, body) = send(srv.client.post(srv.url("/user/group/")).body("{}"), &admin).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "unsupported_media_type");

    let (_, list) = send(srv.client.get(srv.url("/user/group/")), &admin).await;
    assert_eq!(list["count"], 2);
}

#[tokio::test]
async fn group_endpoints() {
    let srv = TestServer::spawn().await;
    let admin = srv.superuser().await;

    let (status, list) = send(srv.client.get(srv.url("/user/group/")), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 2);
    assert_eq!(list["results"][0]["name"], "Operator");
    assert_eq!(list["results"][1]["permissions"][0], "1: emailaddress | Can add email address");

    let (status, body) = send(
        srv.client.post(srv.url("/user/group/")).json(&json!({
            "name": "Tester",
            "permissions": [1, "2: emailaddress | Can change email address"],
        })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["id"], 3);
    assert_eq!(
        body["permissions"],
        json!(["1: emailaddress | Can add email address", "2: emailaddress | Can change email address"])
    );

    let (status, body) = send(
        srv.client.post(srv.url("/user/group/")).json(&json!({ "name": "Operator" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["name"], json!(["group with this name already exists."]));

    let (status, _) = send(
        srv.client.post(srv.url("/user/group/")).json(&json!({ "name": "Bad", "permissions": [999] })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        srv.client.patch(srv.url("/user/group/3/")).json(&json!({ "name": "Renamed" })),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["permissions"].as_array().unwrap().len(), 2);

    let (status, _) = send(srv.client.delete(srv.url("/user/group/3/")), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(srv.client.get(srv.url("/user/group/3/")), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
