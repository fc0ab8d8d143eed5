use crate::error::Error;
use crate::gateway::{MemberHandle, UserHandle};
use crate::resolve::server::is_all_digits;
use crate::resolve::RoutingContext;

/// Candidates requested per server when falling back to member search.
const SEARCH_LIMIT: u8 = 5;

/// Resolve a user from a friendly alias, a raw id, or a member name.
/// Order: alias table (lower-cased exact match; a stale mapping is reported
/// with its detail, never silently bypassed), then raw id for all-digit
/// queries, then a bounded member search across every configured server in
/// registry order.
pub async fn resolve_user(ctx: &RoutingContext, query: &str) -> Result<UserHandle, Error> {
    let gateway = ctx.gateway.as_ref();

    if let Some(id) = ctx.user_aliases.get(query) {
        return gateway.fetch_user(&id).await.map_err(|e| {
            Error::UserNotFound(format!(
                "alias \"{query}\" maps to user {id}, but the lookup failed: {e}"
            ))
        });
    }

    if is_all_digits(query) {
        return gateway
            .fetch_user(query)
            .await
            .map_err(|e| Error::UserNotFound(format!("no user with id \"{query}\": {e}")));
    }

    for (alias, server_id) in ctx.registry.entries() {
        let members = match gateway.search_members(server_id, query, SEARCH_LIMIT).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(server = alias, error = %e, "member search failed; trying next server");
                continue;
            }
        };
        if let Some(member) = members.iter().find(|m| matches_exactly(m, query)) {
            return Ok(member.to_user());
        }
    }

    Err(Error::UserNotFound(format!(
        "\"{query}\" matched no alias, user id, or member name"
    )))
}

fn matches_exactly(member: &MemberHandle, query: &str) -> bool {
    member.username.eq_ignore_ascii_case(query)
        || member.display_name.eq_ignore_ascii_case(query)
        || member
            .global_name
            .as_deref()
            .is_some_and(|g| g.eq_ignore_ascii_case(query))
}
