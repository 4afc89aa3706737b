//! GraphQL documents sent to the Linear API.
//!
//! Selections match the models in [`crate::models`].

const USER_FIELDS: &str =
    "id active avatarUrl createdIssueCount displayName email guest timezone";

const TEAM_FIELDS: &str = "id key name issueCount private";

const ISSUE_FIELDS: &str = "id identifier labelIds number priority priorityLabel slaType \
     title description branchName url \
     projectMilestone { id } creator { id } cycle { id } parent { id } \
     state { id } team { id } assignee { id }";

const WORKFLOW_STATE_FIELDS: &str = "id name position type description";

pub fn viewer() -> String {
    format!("query Viewer {{ viewer {{ {USER_FIELDS} }} }}")
}

pub fn user() -> String {
    format!("query User($id: String!) {{ user(id: $id) {{ {USER_FIELDS} }} }}")
}

pub fn users() -> String {
    format!("query Users {{ users {{ nodes {{ {USER_FIELDS} }} }} }}")
}

pub fn team() -> String {
    format!("query Team($id: String!) {{ team(id: $id) {{ {TEAM_FIELDS} }} }}")
}

pub fn teams() -> String {
    format!(
        "query Teams($filter: TeamFilter) {{ teams(filter: $filter) {{ nodes {{ {TEAM_FIELDS} }} }} }}"
    )
}

pub fn issue() -> String {
    format!("query Issue($id: String!) {{ issue(id: $id) {{ {ISSUE_FIELDS} }} }}")
}

pub fn issues() -> String {
    format!(
        "query Issues($filter: IssueFilter) {{ issues(filter: $filter) {{ nodes {{ {ISSUE_FIELDS} }} }} }}"
    )
}

pub fn search_issues() -> String {
    format!(
        "query SearchIssues($term: String!) {{ searchIssues(term: $term) {{ nodes {{ {ISSUE_FIELDS} }} }} }}"
    )
}

pub fn issue_create() -> String {
    format!(
        "mutation IssueCreate($input: IssueCreateInput!) {{ issueCreate(input: $input) {{ success issue {{ {ISSUE_FIELDS} }} }} }}"
    )
}

pub fn issue_update() -> &'static str {
    "mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) { issueUpdate(id: $id, input: $input) { success } }"
}

pub fn workflow_states() -> String {
    format!(
        "query WorkflowStates($filter: WorkflowStateFilter) {{ workflowStates(filter: $filter) {{ nodes {{ {WORKFLOW_STATE_FIELDS} }} }} }}"
    )
}
