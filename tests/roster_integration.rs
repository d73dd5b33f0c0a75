use mockito::{Matcher, Mock, ServerGuard};
use schedscrape::client::PortalClient;
use schedscrape::config::Config;
use schedscrape::roster::{InvalidCredentials, RosterAggregator};
use schedscrape::storage::TabularStore;
use schedscrape::translator::translate_text;
use std::fs;
use uuid::Uuid;

fn config_for(url: &str, groups: &[&str]) -> Config {
    Config {
        base_url: url.to_string(),
        allow_insecure_certs: true,
        group_ids: groups.iter().map(|g| g.to_string()).collect(),
        ..Config::default()
    }
}

fn roster_page(students: &[(&str, &str)]) -> String {
    let rows: String = students
        .iter()
        .map(|(id, name)| {
            format!(r#"<tr><td><img src="p.png"></td><td><a href="/user/{id}">{name}</a></td></tr>"#)
        })
        .collect();
    format!(r#"<table role="presentation"><tbody>{rows}</tbody></table>"#)
}

fn course_popup(courses: &[(&str, &str)]) -> String {
    let items: String = courses
        .iter()
        .map(|(id, text)| {
            format!(
                r#"<li><div><span class="icon"></span><span><a href="/course/{id}">{text}</a></span></div></li>"#
            )
        })
        .collect();
    serde_json::json!({
        "content": format!(r#"<ul class="my-courses-item-list">{items}</ul>"#)
    })
    .to_string()
}

async fn mock_landing(server: &mut ServerGuard, group: &str, total: u32) -> Mock {
    server
        .mock("GET", format!("/group/{group}/members").as_str())
        .with_status(200)
        .with_body(format!(r#"<div><span class="total">{total}</span></div>"#))
        .create_async()
        .await
}

async fn mock_page(server: &mut ServerGuard, group: &str, page: u32, status: usize, body: String) -> Mock {
    server
        .mock(
            "GET",
            format!("/enrollments/edit/members/group/{group}/ajax").as_str(),
        )
        .match_query(Matcher::UrlEncoded("p".to_string(), page.to_string()))
        .with_status(status)
        .with_body(body)
        .expect(1)
        .create_async()
        .await
}

async fn mock_courses(server: &mut ServerGuard, student: &str, status: usize, body: String) -> Mock {
    server
        .mock("GET", format!("/user/{student}/courses/list").as_str())
        .match_query(Matcher::Any)
        .with_status(status)
        .with_body(body)
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_scrape_dedups_across_groups_and_keeps_encounter_order() {
    let mut server = mockito::Server::new_async().await;

    // G1: one page. G2: 31 members -> two pages, the second one broken.
    let _g1 = mock_landing(&mut server, "G1", 2).await;
    let _g2 = mock_landing(&mut server, "G2", 31).await;
    let g1p1 = mock_page(
        &mut server,
        "G1",
        1,
        200,
        roster_page(&[("101", "Ada"), ("102", "Bob")]),
    )
    .await;
    let g2p1 = mock_page(
        &mut server,
        "G2",
        1,
        200,
        roster_page(&[("102", "Bob"), ("103", "Cy")]),
    )
    .await;
    let g2p2 = mock_page(&mut server, "G2", 2, 500, String::new()).await;

    let ada = mock_courses(
        &mut server,
        "101",
        200,
        course_popup(&[("900", "Art: 1(A)"), ("901", "Band: 2-3(B-C), 5(E)")]),
    )
    .await;
    // Bob is listed in both groups but must be queried once.
    let bob = mock_courses(&mut server, "102", 200, course_popup(&[("900", "Art: 1(A)")])).await;
    let cy = mock_courses(&mut server, "103", 403, String::new()).await;

    let config = config_for(&server.url(), &["G1", "G2"]);
    let client = PortalClient::new(&config).unwrap();
    let aggregator = RosterAggregator::new(&client, &config).unwrap();
    let result = aggregator.scrape_all(&config.group_ids).await.unwrap();

    let ids: Vec<&str> = result.students.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["101", "102"]);
    assert_eq!(result.students[0].name, "Ada");
    // Band has two sections
    assert_eq!(result.students[0].courses.len(), 3);
    assert_eq!(result.students[0].course_at(3, 2), Some("901"));
    assert_eq!(result.students[0].course_at(5, 4), Some("901"));

    let rosters: Vec<(&str, &str, Vec<&str>)> = result
        .membership
        .iter()
        .map(|r| {
            (
                r.id.as_str(),
                r.name.as_str(),
                r.students.iter().map(String::as_str).collect(),
            )
        })
        .collect();
    assert_eq!(
        rosters,
        vec![
            ("900", "Art", vec!["101", "102"]),
            ("901", "Band", vec!["101"]),
        ]
    );

    g1p1.assert_async().await;
    g2p1.assert_async().await;
    g2p2.assert_async().await;
    ada.assert_async().await;
    bob.assert_async().await;
    cy.assert_async().await;
}

#[tokio::test]
async fn test_missing_total_is_invalid_credentials() {
    let mut server = mockito::Server::new_async().await;

    let _landing = server
        .mock("GET", "/group/G1/members")
        .with_status(200)
        .with_body("<form id=\"login\"></form>")
        .create_async()
        .await;

    let config = config_for(&server.url(), &["G1"]);
    let client = PortalClient::new(&config).unwrap();
    let aggregator = RosterAggregator::new(&client, &config).unwrap();
    let err = aggregator.scrape_all(&config.group_ids).await.unwrap_err();

    let invalid = err.downcast_ref::<InvalidCredentials>().unwrap();
    assert_eq!(invalid.group_id, "G1");
}

#[tokio::test]
async fn test_student_without_course_list_is_skipped() {
    let mut server = mockito::Server::new_async().await;

    let _landing = mock_landing(&mut server, "G1", 2).await;
    let _page = mock_page(
        &mut server,
        "G1",
        1,
        200,
        roster_page(&[("201", "Dee"), ("202", "Eve")]),
    )
    .await;
    let _dee = mock_courses(
        &mut server,
        "201",
        200,
        serde_json::json!({ "content": "<p>This profile is private</p>" }).to_string(),
    )
    .await;
    let _eve = mock_courses(&mut server, "202", 200, course_popup(&[("950", "Homeroom")])).await;

    let config = config_for(&server.url(), &["G1"]);
    let client = PortalClient::new(&config).unwrap();
    let aggregator = RosterAggregator::new(&client, &config).unwrap();
    let result = aggregator.scrape_all(&config.group_ids).await.unwrap();

    assert_eq!(result.students.len(), 1);
    let eve = &result.students[0];
    assert_eq!(eve.id, "202");
    // Unparseable schedule text still yields a course, just without slots
    assert_eq!(eve.courses.len(), 1);
    assert!(!eve.courses[0].is_scheduled());
    assert_eq!(result.membership.get("950").unwrap().name, "Homeroom");
}

#[tokio::test]
async fn test_wrapped_names_keep_the_written_file_aligned() {
    let mut server = mockito::Server::new_async().await;

    let _landing = mock_landing(&mut server, "G1", 2).await;
    let _page = mock_page(
        &mut server,
        "G1",
        1,
        200,
        r#"<table role="presentation">
          <tbody>
            <tr>
              <td><img src="p.png"></td>
              <td>
                <a href="/user/301">
                  Grace
                  Hopper
                </a>
              </td>
            </tr>
            <tr>
              <td></td>
              <td><a href="/user/302">Alan   Turing</a></td>
            </tr>
          </tbody>
        </table>"#
            .to_string(),
    )
    .await;
    let wrapped = serde_json::json!({
        "content": r#"<ul class="my-courses-item-list">
          <li>
            <div>
              <span class="icon"></span>
              <span>
                <a href="/course/910">
                  Computer
                  Science: 1-2(A,
                  C)
                </a>
              </span>
            </div>
          </li>
        </ul>"#
    })
    .to_string();
    let _grace = mock_courses(&mut server, "301", 200, wrapped.clone()).await;
    let _alan = mock_courses(&mut server, "302", 200, wrapped).await;

    let config = config_for(&server.url(), &["G1"]);
    let client = PortalClient::new(&config).unwrap();
    let aggregator = RosterAggregator::new(&client, &config).unwrap();
    let result = aggregator.scrape_all(&config.group_ids).await.unwrap();

    assert_eq!(result.students[0].name, "Grace Hopper");
    assert_eq!(result.students[1].name, "Alan Turing");
    assert_eq!(result.students[0].course_at(2, 2), Some("910"));

    let dir = std::env::temp_dir().join(format!("schedscrape-{}", Uuid::new_v4()));
    let student_path = dir.join("studentdata.csv");
    let course_path = dir.join("coursedata.csv");
    TabularStore::write_student_schedules(&student_path, &result.students, &config.schedule)
        .unwrap();
    TabularStore::write_course_membership(&course_path, &result.membership).unwrap();

    let students = fs::read_to_string(&student_path).unwrap();
    let courses = fs::read_to_string(&course_path).unwrap();
    assert_eq!(students.lines().count(), 2 * config.schedule.stride());
    assert_eq!(courses, "910,\"Computer Science\",301,302\n");

    let (_, translated) = translate_text(&courses, &students, &config.schedule).unwrap();
    let lines: Vec<&str> = translated.lines().collect();
    assert_eq!(lines[0], "Grace Hopper");
    assert_eq!(lines[2], "1,\"Computer Science\",,\"Computer Science\",,");
    let _ = fs::remove_dir_all(dir);
}
