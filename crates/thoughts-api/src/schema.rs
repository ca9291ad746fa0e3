//! GraphQL binding for [`Resolvers`].

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, ID, Object, Result, Schema, SimpleObject,
};

use thoughts_types::api::Identity;
use thoughts_types::models::{NewUser, Reaction, Thought, User};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::resolvers::{AuthPayload, Resolvers};

pub type ThoughtsSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(resolvers: Resolvers) -> ThoughtsSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(resolvers)
        .finish()
}

fn resolvers<'a>(ctx: &Context<'a>) -> Result<&'a Resolvers> {
    ctx.data::<Resolvers>()
}

fn caller<'a>(ctx: &Context<'a>) -> Option<&'a Identity> {
    ctx.data_opt::<Caller>().and_then(|caller| caller.0.as_ref())
}

fn gql(err: ApiError) -> async_graphql::Error {
    err.extend()
}

// -- Output types --

pub struct UserObject(pub User);

#[Object(name = "User")]
impl UserObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn friend_count(&self) -> i32 {
        self.0.friend_ids.len() as i32
    }

    async fn thoughts(&self, ctx: &Context<'_>) -> Result<Vec<ThoughtObject>> {
        let thoughts = resolvers(ctx)?.thoughts_of(&self.0).await.map_err(gql)?;
        Ok(thoughts.into_iter().map(ThoughtObject).collect())
    }

    async fn friends(&self, ctx: &Context<'_>) -> Result<Vec<UserObject>> {
        let friends = resolvers(ctx)?.friends_of(&self.0).await.map_err(gql)?;
        Ok(friends.into_iter().map(UserObject).collect())
    }
}

pub struct ThoughtObject(pub Thought);

#[Object(name = "Thought")]
impl ThoughtObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn thought_text(&self) -> &str {
        &self.0.thought_text
    }

    async fn created_at(&self) -> String {
        self.0.created_at.to_rfc3339()
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn reaction_count(&self) -> i32 {
        self.0.reactions.len() as i32
    }

    async fn reactions(&self) -> Vec<ReactionObject> {
        self.0.reactions.iter().cloned().map(ReactionObject).collect()
    }
}

pub struct ReactionObject(pub Reaction);

#[Object(name = "Reaction")]
impl ReactionObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn reaction_body(&self) -> &str {
        &self.0.reaction_body
    }

    async fn created_at(&self) -> String {
        self.0.created_at.to_rfc3339()
    }

    async fn username(&self) -> &str {
        &self.0.username
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Auth")]
pub struct AuthObject {
    token: String,
    user: UserObject,
}

impl From<AuthPayload> for AuthObject {
    fn from(payload: AuthPayload) -> Self {
        Self {
            token: payload.token,
            user: UserObject(payload.user),
        }
    }
}

// -- Roots --

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The logged-in user's profile. Requires a token.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<UserObject>> {
        let user = resolvers(ctx)?.me(caller(ctx)).await.map_err(gql)?;
        Ok(user.map(UserObject))
    }

    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<UserObject>> {
        let users = resolvers(ctx)?.users().await.map_err(gql)?;
        Ok(users.into_iter().map(UserObject).collect())
    }

    async fn user(&self, ctx: &Context<'_>, username: String) -> Result<Option<UserObject>> {
        let user = resolvers(ctx)?.user(&username).await.map_err(gql)?;
        Ok(user.map(UserObject))
    }

    /// Newest first, optionally only those by `username`.
    async fn thoughts(
        &self,
        ctx: &Context<'_>,
        username: Option<String>,
    ) -> Result<Vec<ThoughtObject>> {
        let thoughts = resolvers(ctx)?
            .thoughts(username.as_deref())
            .await
            .map_err(gql)?;
        Ok(thoughts.into_iter().map(ThoughtObject).collect())
    }

    async fn thought(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "_id")] id: ID,
    ) -> Result<Option<ThoughtObject>> {
        let thought = resolvers(ctx)?.thought(&id).await.map_err(gql)?;
        Ok(thought.map(ThoughtObject))
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthObject> {
        let payload = resolvers(ctx)?
            .login(&email, &password)
            .await
            .map_err(gql)?;
        Ok(payload.into())
    }

    async fn add_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        email: String,
        password: String,
    ) -> Result<AuthObject> {
        let payload = resolvers(ctx)?
            .add_user(NewUser {
                username,
                email,
                password,
            })
            .await
            .map_err(gql)?;
        Ok(payload.into())
    }

    async fn add_thought(&self, ctx: &Context<'_>, thought_text: String) -> Result<ThoughtObject> {
        let thought = resolvers(ctx)?
            .add_thought(caller(ctx), &thought_text)
            .await
            .map_err(gql)?;
        Ok(ThoughtObject(thought))
    }

    async fn add_reaction(
        &self,
        ctx: &Context<'_>,
        thought_id: ID,
        reaction_body: String,
    ) -> Result<Option<ThoughtObject>> {
        let thought = resolvers(ctx)?
            .add_reaction(caller(ctx), &thought_id, &reaction_body)
            .await
            .map_err(gql)?;
        Ok(thought.map(ThoughtObject))
    }

    async fn add_friend(&self, ctx: &Context<'_>, friend_id: ID) -> Result<Option<UserObject>> {
        let user = resolvers(ctx)?
            .add_friend(caller(ctx), &friend_id)
            .await
            .map_err(gql)?;
        Ok(user.map(UserObject))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_graphql::{Request, Variables};
    use chrono::Duration;
    use serde_json::{Value, json};
    use thoughts_db::MemoryStore;

    use super::*;
    use crate::auth::TokenSigner;

    fn schema() -> (ThoughtsSchema, TokenSigner) {
        let signer = TokenSigner::new("test-secret", Duration::hours(2));
        let resolvers = Resolvers::new(Arc::new(MemoryStore::new()), signer.clone());
        (build_schema(resolvers), signer)
    }

    async fn run(schema: &ThoughtsSchema, caller: Option<Identity>, query: &str, vars: Value) -> Value {
        let request = Request::new(query)
            .variables(Variables::from_json(vars))
            .data(Caller(caller));
        let res = schema.execute(request).await;
        serde_json::to_value(&res).unwrap()
    }

    async fn signup(schema: &ThoughtsSchema, signer: &TokenSigner, name: &str) -> Identity {
        let res = run(
            schema,
            None,
            r#"mutation($u: String!, $e: String!, $p: String!) {
                addUser(username: $u, email: $e, password: $p) { token user { _id username } }
            }"#,
            json!({ "u": name, "e": format!("{}@example.com", name), "p": "password12345" }),
        )
        .await;
        let token = res["data"]["addUser"]["token"].as_str().unwrap();
        signer.verify(token).unwrap()
    }

    #[tokio::test]
    async fn anonymous_me_is_an_unauthenticated_error() {
        let (schema, _) = schema();

        let res = run(&schema, None, "{ me { _id } }", json!({})).await;

        assert!(res["data"]["me"].is_null());
        assert_eq!(res["errors"][0]["message"], "You need to be logged in!");
        assert_eq!(res["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn password_is_not_part_of_the_schema() {
        let (schema, signer) = schema();
        let me = signup(&schema, &signer, "lernantino").await;

        let res = run(&schema, Some(me), "{ me { _id password } }", json!({})).await;
        assert!(
            res["errors"][0]["message"]
                .as_str()
                .unwrap()
                .contains("Unknown field \"password\"")
        );

        let res = run(&schema, None, "{ users { username email } }", json!({})).await;
        let users = res["data"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].get("password").is_none());
    }

    #[tokio::test]
    async fn me_resolves_friends_and_thoughts_inline() {
        let (schema, signer) = schema();
        let me = signup(&schema, &signer, "me").await;
        let friend = signup(&schema, &signer, "friend").await;

        run(
            &schema,
            Some(friend.clone()),
            r#"mutation { addThought(thoughtText: "from a friend") { _id } }"#,
            json!({}),
        )
        .await;
        run(
            &schema,
            Some(me.clone()),
            r#"mutation { addThought(thoughtText: "mine") { _id } }"#,
            json!({}),
        )
        .await;
        let res = run(
            &schema,
            Some(me.clone()),
            "mutation($id: ID!) { addFriend(friendId: $id) { friendCount } }",
            json!({ "id": friend.id.to_string() }),
        )
        .await;
        assert_eq!(res["data"]["addFriend"]["friendCount"], 1);

        let res = run(
            &schema,
            Some(me),
            r#"{ me {
                username
                friendCount
                thoughts { thoughtText username }
                friends { username thoughts { thoughtText } }
            } }"#,
            json!({}),
        )
        .await;

        let me = &res["data"]["me"];
        assert_eq!(me["username"], "me");
        assert_eq!(me["friendCount"], 1);
        assert_eq!(me["thoughts"], json!([{ "thoughtText": "mine", "username": "me" }]));
        assert_eq!(
            me["friends"],
            json!([{ "username": "friend", "thoughts": [{ "thoughtText": "from a friend" }] }])
        );
    }

    #[tokio::test]
    async fn add_reaction_on_missing_thought_is_null_not_error() {
        let (schema, signer) = schema();
        let me = signup(&schema, &signer, "me").await;

        let res = run(
            &schema,
            Some(me),
            r#"mutation { addReaction(thoughtId: "00000000-0000-0000-0000-000000000000", reactionBody: "hi") { _id } }"#,
            json!({}),
        )
        .await;

        assert!(res.get("errors").is_none());
        assert!(res["data"]["addReaction"].is_null());
    }

    #[tokio::test]
    async fn reactions_and_counts_are_exposed() {
        let (schema, signer) = schema();
        let me = signup(&schema, &signer, "me").await;

        let res = run(
            &schema,
            Some(me.clone()),
            r#"mutation { addThought(thoughtText: "hello") { _id username createdAt } }"#,
            json!({}),
        )
        .await;
        let thought_id = res["data"]["addThought"]["_id"].as_str().unwrap().to_string();
        assert_eq!(res["data"]["addThought"]["username"], "me");

        run(
            &schema,
            Some(me),
            "mutation($id: ID!) { addReaction(thoughtId: $id, reactionBody: \"+1\") { _id } }",
            json!({ "id": thought_id }),
        )
        .await;

        let res = run(
            &schema,
            None,
            "query($id: ID!) { thought(_id: $id) { reactionCount reactions { reactionBody username } } }",
            json!({ "id": thought_id }),
        )
        .await;
        assert_eq!(res["data"]["thought"]["reactionCount"], 1);
        assert_eq!(
            res["data"]["thought"]["reactions"],
            json!([{ "reactionBody": "+1", "username": "me" }])
        );
    }

    #[tokio::test]
    async fn login_errors_share_one_code() {
        let (schema, signer) = schema();
        signup(&schema, &signer, "lernantino").await;

        let login = r#"mutation($e: String!, $p: String!) { login(email: $e, password: $p) { token } }"#;
        let wrong_password = run(
            &schema,
            None,
            login,
            json!({ "e": "lernantino@example.com", "p": "wrong" }),
        )
        .await;
        let unknown_email = run(
            &schema,
            None,
            login,
            json!({ "e": "ghost@example.com", "p": "password12345" }),
        )
        .await;

        assert_eq!(wrong_password["errors"][0]["message"], unknown_email["errors"][0]["message"]);
        assert_eq!(
            wrong_password["errors"][0]["extensions"],
            unknown_email["errors"][0]["extensions"]
        );
        assert_eq!(
            wrong_password["errors"][0]["extensions"]["code"],
            "INVALID_CREDENTIALS"
        );
    }

    #[test]
    fn sdl_uses_the_public_field_names() {
        let (schema, _) = schema();
        let sdl = schema.sdl();

        for field in ["_id: ID!", "thoughtText: String!", "friendCount: Int!", "reactionCount: Int!"] {
            assert!(sdl.contains(field), "missing {} in\n{}", field, sdl);
        }
        assert!(sdl.contains("thought(_id: ID!): Thought"));
        assert!(sdl.contains("addReaction(thoughtId: ID!, reactionBody: String!): Thought"));
        assert!(!sdl.contains("password: String!\n"));
    }
}
