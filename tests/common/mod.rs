//! In-memory repository fakes and HTTP helpers shared by integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use yatube::{
    application::{
        auth::AuthService,
        feed::FeedService,
        follows::FollowService,
        pagination::PageSlice,
        posts::PostService,
        profiles::ProfileService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, NewPostParams, PostListScope, PostsRepo,
            PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
        },
    },
    cache::{CacheState, PageCache},
    domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord},
    infra::{
        http::{HttpState, build_router},
        uploads::UploadStorage,
    },
};

const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    author_id: i64,
    group_id: Option<i64>,
    text: String,
    image: Option<String>,
    published_at: OffsetDateTime,
}

#[derive(Default)]
struct Store {
    users: Vec<UserRecord>,
    sessions: HashMap<Uuid, i64>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<CommentRecord>,
    follows: HashSet<(i64, i64)>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, id: i64) -> String {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    fn materialize(&self, post: &StoredPost) -> PostRecord {
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id));
        PostRecord {
            id: post.id,
            author_id: post.author_id,
            author_username: self.username(post.author_id),
            group_id: post.group_id,
            group_slug: group.map(|group| group.slug.clone()),
            group_title: group.map(|group| group.title.clone()),
            text: post.text.clone(),
            image: post.image.clone(),
            published_at: post.published_at,
            comment_count: self
                .comments
                .iter()
                .filter(|comment| comment.post_id == post.id)
                .count() as i64,
        }
    }

    fn scoped(&self, scope: PostListScope) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|post| match scope {
                PostListScope::Global => true,
                PostListScope::Group { group_id } => post.group_id == Some(group_id),
                PostListScope::Author { author_id } => post.author_id == author_id,
                PostListScope::FollowedBy { viewer_id } => {
                    self.follows.contains(&(viewer_id, post.author_id))
                }
            })
            .map(|post| self.materialize(post))
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts
    }
}

/// All repository traits backed by one in-process store.
#[derive(Clone, Default)]
pub struct MemoryRepos {
    store: Arc<RwLock<Store>>,
}

impl MemoryRepos {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_group(&self, slug: &str, title: &str) -> GroupRecord {
        let mut store = self.store.write().unwrap();
        let group = GroupRecord {
            id: store.next_id(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: format!("Posts about {title}"),
        };
        store.groups.push(group.clone());
        group
    }

    pub fn post_count(&self) -> usize {
        self.store.read().unwrap().posts.len()
    }

    pub fn comment_count(&self) -> usize {
        self.store.read().unwrap().comments.len()
    }

    pub fn follow_edge_count(&self) -> usize {
        self.store.read().unwrap().follows.len()
    }

    /// Id of the author's most recently published post.
    pub fn latest_post_id(&self, username: &str) -> i64 {
        let store = self.store.read().unwrap();
        let author_id = store
            .users
            .iter()
            .find(|user| user.username == username)
            .map(|user| user.id)
            .expect("author exists");
        store
            .posts
            .iter()
            .filter(|post| post.author_id == author_id)
            .map(|post| post.id)
            .max()
            .expect("author has a post")
    }

    pub fn post_author(&self, post_id: i64) -> String {
        let store = self.store.read().unwrap();
        let author_id = store
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .map(|post| post.author_id)
            .expect("post exists");
        store.username(author_id)
    }

    pub fn post_text(&self, post_id: i64) -> String {
        let store = self.store.read().unwrap();
        store
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .map(|post| post.text.clone())
            .expect("post exists")
    }

    pub fn post_image(&self, post_id: i64) -> Option<String> {
        let store = self.store.read().unwrap();
        store
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .and_then(|post| post.image.clone())
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError> {
        let mut store = self.store.write().unwrap();
        if store.users.iter().any(|user| user.username == username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: store.next_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            joined_at: OffsetDateTime::now_utc(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store.users.iter().find(|user| user.id == id).cloned())
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepos {
    async fn create_session(&self, user_id: i64, token: Uuid) -> Result<(), RepoError> {
        self.store.write().unwrap().sessions.insert(token, user_id);
        Ok(())
    }

    async fn find_user_by_token(&self, token: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store
            .sessions
            .get(&token)
            .and_then(|user_id| store.users.iter().find(|user| user.id == *user_id))
            .cloned())
    }

    async fn delete_session(&self, token: Uuid) -> Result<(), RepoError> {
        self.store.write().unwrap().sessions.remove(&token);
        Ok(())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepos {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let store = self.store.read().unwrap();
        let mut groups = store.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn list_for_author(&self, author_id: i64) -> Result<Vec<GroupRecord>, RepoError> {
        let store = self.store.read().unwrap();
        let mut groups: Vec<GroupRecord> = store
            .groups
            .iter()
            .filter(|group| {
                store
                    .posts
                    .iter()
                    .any(|post| post.author_id == author_id && post.group_id == Some(group.id))
            })
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_posts(
        &self,
        scope: PostListScope,
        slice: PageSlice,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store
            .scoped(scope)
            .into_iter()
            .skip(slice.offset as usize)
            .take(slice.limit as usize)
            .collect())
    }

    async fn count_posts(&self, scope: PostListScope) -> Result<u64, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store.scoped(scope).len() as u64)
    }

    async fn list_author_posts(&self, author_id: i64) -> Result<Vec<PostRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store.scoped(PostListScope::Author { author_id }))
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let store = self.store.read().unwrap();
        Ok(store
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| store.materialize(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let mut store = self.store.write().unwrap();
        let post = StoredPost {
            id: store.next_id(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            published_at: OffsetDateTime::now_utc(),
        };
        store.posts.push(post.clone());
        Ok(store.materialize(&post))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut store = self.store.write().unwrap();
        let index = store
            .posts
            .iter()
            .position(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        {
            let post = &mut store.posts[index];
            post.author_id = params.author_id;
            post.text = params.text;
            post.group_id = params.group_id;
            post.image = params.image;
        }
        let post = store.posts[index].clone();
        Ok(store.materialize(&post))
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let store = self.store.read().unwrap();
        let mut comments: Vec<CommentRecord> = store
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(comments)
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentRecord, RepoError> {
        let mut store = self.store.write().unwrap();
        let comment = CommentRecord {
            id: store.next_id(),
            post_id,
            author_id,
            author_username: store.username(author_id),
            text: text.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepos {
    async fn insert_edge(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .store
            .write()
            .unwrap()
            .follows
            .insert((follower_id, author_id)))
    }

    async fn delete_edge(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .store
            .write()
            .unwrap()
            .follows
            .remove(&(follower_id, author_id)))
    }

    async fn edge_exists(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .store
            .read()
            .unwrap()
            .follows
            .contains(&(follower_id, author_id)))
    }

    async fn follower_count(&self, author_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .store
            .read()
            .unwrap()
            .follows
            .iter()
            .filter(|(_, a)| *a == author_id)
            .count() as u64)
    }

    async fn following_count(&self, user_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .store
            .read()
            .unwrap()
            .follows
            .iter()
            .filter(|(f, _)| *f == user_id)
            .count() as u64)
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: MemoryRepos,
    _media_dir: tempfile::TempDir,
}

pub fn build_app(cache_ttl: Option<Duration>) -> TestApp {
    let repos = MemoryRepos::new();
    let media_dir = tempfile::tempdir().expect("media tempdir");
    let uploads = Arc::new(UploadStorage::new(media_dir.path()));

    let repo = Arc::new(repos.clone());
    let feed = Arc::new(FeedService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        PAGE_SIZE,
    ));
    let profiles = Arc::new(ProfileService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
    ));
    let posts = Arc::new(PostService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        uploads.clone(),
    ));
    let follows = Arc::new(FollowService::new(repo.clone(), repo.clone()));
    let auth = Arc::new(AuthService::new(repo.clone(), repo.clone()));

    let cache = cache_ttl.map(|ttl| CacheState {
        pages: Arc::new(PageCache::new(ttl, 32)),
    });

    let state = HttpState {
        feed,
        profiles,
        posts,
        follows,
        auth,
        db: None,
        uploads,
        cache,
    };

    TestApp {
        router: build_router(state),
        repos,
        _media_dir: media_dir,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router response")
}

pub async fn get(router: &Router, path: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(router, builder.body(Body::empty()).expect("request")).await
}

pub async fn post_form(
    router: &Router,
    path: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(
        router,
        builder.body(Body::from(body.to_string())).expect("request"),
    )
    .await
}

const BOUNDARY: &str = "test-boundary-7MA4YWxk";

/// Build a multipart post-form body. `image` is `(filename, content_type,
/// bytes)` when a file part should be attached.
pub fn multipart_body(
    text: &str,
    group: &str,
    image: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in [("text", text), ("group", group)] {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, content_type, bytes)) = image {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn post_multipart(
    router: &Router,
    path: &str,
    text: &str,
    group: &str,
    image: Option<(&str, &str, &[u8])>,
    cookie: Option<&str>,
) -> Response<Body> {
    let (content_type, body) = multipart_body(text, group, image);
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(router, builder.body(Body::from(body)).expect("request")).await
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

/// Register an account and log in, returning the session cookie to send on
/// subsequent requests.
pub async fn signup_and_login(router: &Router, username: &str) -> String {
    let signup = post_form(
        router,
        "/auth/signup/",
        &format!("username={username}&password1=sup3rs3cret&password2=sup3rs3cret"),
        None,
    )
    .await;
    assert_eq!(signup.status(), StatusCode::SEE_OTHER);

    let login = post_form(
        router,
        "/auth/login/",
        &format!("username={username}&password=sup3rs3cret"),
        None,
    )
    .await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
    session_cookie_from(&login).expect("session cookie")
}

/// Publish a plain text post through the HTTP surface.
pub async fn publish_post(router: &Router, cookie: &str, text: &str, group: &str) {
    let response = post_multipart(router, "/new/", text, group, None, Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
